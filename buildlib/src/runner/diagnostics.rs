/// A known tool failure whose raw output is not actionable on its own.
struct KnownFailure {
    pattern: &'static str,
    hint: &'static [&'static str],
}

const KNOWN_FAILURES: &[KnownFailure] = &[KnownFailure {
    pattern: "Cannot create symbolic link",
    hint: &[
        "Hint: Windows refused to create a symbolic link while unpacking the packaging tools.",
        "Hint: enable Developer Mode (Settings > Privacy & security > For developers) or run the server as Administrator, then retry the build.",
    ],
}];

/// Remediation lines to append after an error line, if it matches a known failure.
pub fn hints_for(line: &str) -> impl Iterator<Item = &'static str> + '_ {
    KNOWN_FAILURES
        .iter()
        .filter(move |failure| line.contains(failure.pattern))
        .flat_map(|failure| failure.hint.iter().copied())
}
