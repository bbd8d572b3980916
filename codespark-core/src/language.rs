//! Language detection from file names.

/// Identifier used when no language can be inferred.
pub const PLAIN_TEXT: &str = "plaintext";

/// Infer a language identifier from a file name's extension.
///
/// # Example
///
/// ```rust
/// use codespark_core::language::language_for_path;
///
/// assert_eq!(language_for_path("/src/main.rs"), "rust");
/// assert_eq!(language_for_path("App.JSX"), "javascript");
/// assert_eq!(language_for_path("Makefile"), "plaintext");
/// ```
pub fn language_for_path(path: &str) -> &'static str {
    let name = crate::path::name_of(path);
    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return PLAIN_TEXT,
    };

    match extension.as_str() {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "json" => "json",
        "xml" => "xml",
        "md" => "markdown",
        "sql" => "sql",
        "sh" => "shell",
        "yml" | "yaml" => "yaml",
        _ => PLAIN_TEXT,
    }
}
