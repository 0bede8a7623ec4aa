use regex::Regex;

/// Structural headings recognized in resume-style documents, matched as
/// case-insensitive whole words anywhere in a line. Longer phrases come
/// first so the alternation prefers them.
const SECTION_HEADER_PATTERN: &str = r"(?i)\b(?:work experience|technical skills|education|experience|skills|projects|certifications|awards|achievements)\b";

/// Splits normalized text into sections at detected heading lines. Blank
/// lines are dropped while scanning; a section runs from one heading line to
/// the next.
pub struct SectionSplitter {
    header_re: Regex,
}

impl SectionSplitter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            header_re: Regex::new(SECTION_HEADER_PATTERN)?,
        })
    }

    /// Returns the detected sections, or a single element holding the whole
    /// input when fewer than two sections were found. Callers use the
    /// single-element case to fall back to paragraph-based chunking.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current = String::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if self.header_re.is_match(line) && !current.trim().is_empty() {
                sections.push(current.trim().to_string());
                current = format!("{line}\n");
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }

        if !current.trim().is_empty() {
            sections.push(current.trim().to_string());
        }

        if sections.len() > 1 {
            sections
        } else {
            vec![text.to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SectionSplitter;

    fn splitter() -> SectionSplitter {
        SectionSplitter::new().expect("static pattern compiles")
    }

    #[test]
    fn text_without_headings_stays_whole() {
        let text = "Just a plain letter.\nNothing structured about it.";
        let sections = splitter().split(text);
        assert_eq!(sections, vec![text.to_string()]);
    }

    #[test]
    fn heading_lines_open_new_sections() {
        let text = "Jane Doe\nWork Experience\nAcme Corp, 2020-2024\nEducation\nSome University";
        let sections = splitter().split(text);
        assert_eq!(sections.len(), 3);
        assert!(sections[1].starts_with("Work Experience"));
        assert!(sections[2].starts_with("Education"));
    }

    #[test]
    fn heading_match_is_case_insensitive_and_whole_word() {
        let sections = splitter().split("Intro line\nTECHNICAL SKILLS\nRust, SQL");
        assert_eq!(sections.len(), 2);
        assert!(sections[1].starts_with("TECHNICAL SKILLS"));

        // "inexperienced" must not count as an Experience heading.
        let sections = splitter().split("An inexperienced reader\nwrote this note");
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn blank_lines_are_dropped_while_scanning() {
        let sections = splitter().split("Summary\n\n\nSkills\n\nRust");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1], "Skills\nRust");
    }
}
