//! File name filtering for pair discovery.

/// Decides which directory entries take part in pairing.
///
/// Matching is an exact, case-sensitive suffix test on the file name:
/// `.pdf` accepts `report.pdf` but not `report.PDF`.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    /// Required file name suffix
    extension: String,
}

impl DocumentFilter {
    /// Create a filter for the given suffix (e.g. `.pdf`)
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Check if a file name should be paired
    pub fn should_include(&self, name: &str) -> bool {
        name.ends_with(&self.extension)
    }
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self::new(".pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_includes_pdf() {
        let filter = DocumentFilter::default();
        assert!(filter.should_include("invoice.pdf"));
        assert!(filter.should_include("annual report 2024.pdf"));
    }

    #[test]
    fn filter_is_case_sensitive() {
        let filter = DocumentFilter::default();
        assert!(!filter.should_include("INVOICE.PDF"));
    }

    #[test]
    fn filter_excludes_other_extensions() {
        let filter = DocumentFilter::default();
        assert!(!filter.should_include("notes.txt"));
        assert!(!filter.should_include("scan.png"));
        assert!(!filter.should_include("pdf"));
    }

    #[test]
    fn dot_files_are_plain_names() {
        let filter = DocumentFilter::default();
        assert!(filter.should_include(".draft.pdf"));
        assert!(filter.should_include(".pdf"));
    }

    #[test]
    fn custom_extension() {
        let filter = DocumentFilter::new(".PDF");
        assert!(filter.should_include("SCAN.PDF"));
        assert!(!filter.should_include("scan.pdf"));
    }
}
