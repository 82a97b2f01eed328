//! Small shared helpers.

/// Output a warning message that we want to be quite visible; warnings are
/// informational and never change the exit code.
pub(crate) fn visible_warning(s: &str) {
    anstream::eprintln!(
        "{}warning: {s}{}",
        anstyle::AnsiColor::Yellow.render_fg(),
        anstyle::Reset.render()
    );
}
