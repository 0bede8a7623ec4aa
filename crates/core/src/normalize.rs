use regex::Regex;

/// Literal artifact substitutions, applied in order before any regex pass.
/// The compound glyph sequences come first so that stripping the lone stray
/// glyphs cannot break them apart.
const ARTIFACT_TABLE: [(&str, &str); 8] = [
    ("/envel\u{2322}pe", " | Email: "),
    ("/linkedin", " | LinkedIn: "),
    ("/github", " | GitHub: "),
    ("\u{2642}", ""),
    ("\u{2640}", ""),
    ("\u{2322}", ""),
    ("  +", " "),
    ("\n\n\n", "\n\n"),
];

/// Cleans text extracted from PDFs and Word documents: strips known OCR and
/// icon-font artifacts, reformats contact patterns, and collapses runaway
/// whitespace. `normalize` is idempotent.
pub struct TextNormalizer {
    phone_re: Regex,
    email_re: Regex,
    spaces_re: Regex,
    newlines_re: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            phone_re: Regex::new(r"phone\+(\d+)")?,
            email_re: Regex::new(r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})")?,
            spaces_re: Regex::new(r" {2,}")?,
            newlines_re: Regex::new(r"\n{3,}")?,
        })
    }

    pub fn normalize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let mut cleaned = text.to_string();
        for (artifact, replacement) in ARTIFACT_TABLE {
            cleaned = cleaned.replace(artifact, replacement);
        }

        // Contact reformatting runs before the whitespace collapse so the
        // padding added around email addresses is reduced to single spaces.
        let cleaned = self.phone_re.replace_all(&cleaned, "Phone: +$1");
        let cleaned = self.email_re.replace_all(&cleaned, " $1 ");
        let cleaned = self.spaces_re.replace_all(&cleaned, " ");
        let cleaned = self.newlines_re.replace_all(&cleaned, "\n\n");

        cleaned.trim().to_string()
    }
}
