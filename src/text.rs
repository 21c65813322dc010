use crate::error::LoadError;

/// A plain-text piece (poem, note) split into title, body and trailing date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub title: Option<String>,
    pub body: String,
    pub date: Option<String>,
}

impl TextDocument {
    pub fn fetch(path: &str, explicit_title: Option<&str>) -> Result<Self, LoadError> {
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::Unreachable {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::parse(&raw, explicit_title))
    }

    /// Without an explicit title the first line is the title. A last line
    /// that looks like `D/M/YYYY` is the date and is left out of the body.
    pub fn parse(raw: &str, explicit_title: Option<&str>) -> Self {
        let mut lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
        trim_blank_edges(&mut lines);

        let date = match lines.last() {
            Some(last) if is_date_line(last) => {
                let date = last.trim().to_string();
                lines.pop();
                trim_blank_edges(&mut lines);
                Some(date)
            }
            _ => None,
        };

        let title = match explicit_title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => Some(title.to_string()),
            None if !lines.is_empty() => {
                let first = lines.remove(0).trim().to_string();
                trim_blank_edges(&mut lines);
                Some(first)
            }
            None => None,
        };

        Self {
            title,
            body: lines.join("\n"),
            date,
        }
    }
}

fn trim_blank_edges(lines: &mut Vec<&str>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading);
}

/// `D/M/YYYY` with one or two digit day and month. `-` and `.` also work as
/// separators.
pub fn is_date_line(line: &str) -> bool {
    parse_date(line).is_some()
}

/// Parse a `D/M/YYYY` date into `(year, month, day)`.
pub fn parse_date(line: &str) -> Option<(u32, u32, u32)> {
    let parts: Vec<&str> = line.trim().split(['/', '-', '.']).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };
    let number = |s: &str, min: usize, max: usize| {
        if (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse::<u32>().ok()
        } else {
            None
        }
    };
    let day = number(*day, 1, 2)?;
    let month = number(*month, 1, 2)?;
    let year = number(*year, 4, 4)?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_date_are_split_out() {
        let raw = "\nAutumn\n\nleaves fall\nquietly down\n\n12/10/2021\n";
        let doc = TextDocument::parse(raw, None);
        assert_eq!(doc.title.as_deref(), Some("Autumn"));
        assert_eq!(doc.body, "leaves fall\nquietly down");
        assert_eq!(doc.date.as_deref(), Some("12/10/2021"));
    }

    #[test]
    fn test_explicit_title_keeps_first_line() {
        let doc = TextDocument::parse("first line\nsecond line", Some("Untitled No. 4"));
        assert_eq!(doc.title.as_deref(), Some("Untitled No. 4"));
        assert_eq!(doc.body, "first line\nsecond line");
        assert_eq!(doc.date, None);
    }

    #[test]
    fn test_date_line_shapes() {
        assert!(is_date_line("1/2/2020"));
        assert!(is_date_line(" 31-12-1999 "));
        assert!(is_date_line("3.4.2024"));
        assert!(!is_date_line("2024/01/01"));
        assert!(!is_date_line("1/2/20"));
        assert!(!is_date_line("the end"));
        assert!(!is_date_line("40/13/2020"));
        assert_eq!(parse_date("7/11/2019"), Some((2019, 11, 7)));
    }

    #[test]
    fn test_empty_text() {
        let doc = TextDocument::parse("  \n\n", None);
        assert_eq!(doc.title, None);
        assert_eq!(doc.body, "");
        assert_eq!(doc.date, None);
    }

    #[test]
    fn test_fetch_missing_file() {
        let err = TextDocument::fetch("/no/such/poem.txt", None).unwrap_err();
        assert!(matches!(err, LoadError::Unreachable { .. }));
    }
}
