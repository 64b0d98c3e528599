use color_print::cprintln;

/// Non-aborting console diagnostics. Fatal conditions go through
/// [`crate::error::Error`] instead.
#[derive(Debug)]
pub enum Msg {
    Warn(String),
    Note(String),
}

impl Msg {
    pub fn diag(&self, info: (&str, usize, &str)) {
        let (file, line, raw) = info;
        match self {
            Msg::Warn(msg) => cprintln!("<yellow,bold>warn</>: {}", msg),
            Msg::Note(msg) => cprintln!("<green,bold>note</>: {}", msg),
        }
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line + 1);
        cprintln!("      <blue>|</>");
        cprintln!(" <blue>{:>4} |</> {}", line + 1, raw);
        cprintln!("      <blue>|</>");
    }
}
