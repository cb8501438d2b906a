use super::*;

/// Anything shorter than this after trimming is scanner noise.
pub const MIN_LINE_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub code: String,
    pub name_local: String,
    pub name_en: String,
    pub postal_code: String,
}

/// Row layouts recognised in OCR output, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinePattern {
    /// `1 010000 <khmer> Banteay Meanchey 010000`
    RowNumbered,
    /// `010000 <khmer> Banteay Meanchey 010000`
    Bare,
    /// The same four fields anywhere in the line, noise on either side.
    Embedded,
}

impl LinePattern {
    pub const PRECEDENCE: [LinePattern; 3] = [
        LinePattern::RowNumbered,
        LinePattern::Bare,
        LinePattern::Embedded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LinePattern::RowNumbered => "row_numbered",
            LinePattern::Bare => "bare",
            LinePattern::Embedded => "embedded",
        }
    }

    fn regex_source(self) -> &'static str {
        match self {
            LinePattern::RowNumbered => {
                r"^[0-9]+\s+([0-9]{6})\s+(.+?)\s+([A-Za-z][A-Za-z\s\-'.]+?)\s+([0-9]{6})\s*$"
            }
            LinePattern::Bare => {
                r"^([0-9]{6})\s+(.+?)\s+([A-Za-z][A-Za-z\s\-'.]+?)\s+([0-9]{6})\s*$"
            }
            LinePattern::Embedded => {
                r"([0-9]{6})\s+(.+?)\s+([A-Za-z][A-Za-z\s\-'.]+?)\s+([0-9]{6})"
            }
        }
    }
}

#[derive(Debug)]
pub struct LineParser {
    patterns: Vec<(LinePattern, Regex)>,
    leading_digits: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::with_capacity(LinePattern::PRECEDENCE.len());
        for pattern in LinePattern::PRECEDENCE {
            let regex = Regex::new(pattern.regex_source()).with_context(|| {
                format!("failed to compile {} line regex", pattern.as_str())
            })?;
            patterns.push((pattern, regex));
        }

        Ok(Self {
            patterns,
            leading_digits: Regex::new(r"^[\d\s]+")
                .context("failed to compile leading digits regex")?,
        })
    }

    pub fn parse(&self, line: &str) -> Option<CandidateRecord> {
        self.parse_with_pattern(line).map(|(_, record)| record)
    }

    /// First pattern in precedence order that matches wins.
    pub fn parse_with_pattern(&self, line: &str) -> Option<(LinePattern, CandidateRecord)> {
        LinePattern::PRECEDENCE.iter().find_map(|pattern| {
            self.match_pattern(*pattern, line)
                .map(|record| (*pattern, record))
        })
    }

    /// Tries a single pattern, ignoring precedence.
    pub fn match_pattern(&self, pattern: LinePattern, line: &str) -> Option<CandidateRecord> {
        let line = line.trim();
        if line.chars().count() < MIN_LINE_CHARS {
            return None;
        }

        self.patterns
            .iter()
            .find(|(candidate, _)| *candidate == pattern)
            .and_then(|(_, regex)| self.extract(regex, line))
    }

    fn extract(&self, regex: &Regex, line: &str) -> Option<CandidateRecord> {
        let captures = regex.captures(line)?;
        let code = captures.get(1)?.as_str().to_string();
        let name_local = captures.get(2)?.as_str().trim();
        let name_en = captures.get(3)?.as_str().trim().to_string();
        let postal_code = captures.get(4)?.as_str().to_string();

        // OCR sometimes repeats the code at the start of the Khmer column.
        let name_local = self.leading_digits.replace(name_local, "").trim().to_string();

        Some(CandidateRecord {
            code,
            name_local,
            name_en,
            postal_code,
        })
    }
}
