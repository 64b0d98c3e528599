use color_print::cprintln;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid .PATCH directive: {0}")]
    MalformedDirective(String),

    #[error(".PATCH IGNORE must be the first line of the fragment")]
    InvalidIgnore,

    #[error("Invalid region: `{0}`")]
    InvalidRegion(String),

    #[error("Invalid number: `{0}` (offsets must be hexadecimal)")]
    InvalidNumber(String),

    #[error("Unresolved reference: `{0}`")]
    UnresolvedReference(String),

    #[error("Duplicate address 0x{addr:08X} (already written by {first})")]
    DuplicateAddress { addr: u32, first: String },

    #[error("Re-defined label `{name}` (first defined at {first})")]
    DuplicateLabel { name: String, first: String },

    #[error("Re-defined variable `{name}` (first defined at {first})")]
    DuplicateVariable { name: String, first: String },

    #[error("Code overruns assertion at 0x{target:08X} by 0x{over:X} bytes")]
    AssertOverrun { target: u32, over: u32 },

    #[error("Malformed string literal: {0}")]
    MalformedString(String),

    #[error("Invalid branch to `{0}`, perhaps a symbol is missing?")]
    InvalidBranch(String),

    #[error("Cyclic variable definition involving `{0}`")]
    VariableCycle(String),

    #[error("Malformed symbol entry: `{0}`")]
    MalformedSymbol(String),

    #[error("Assembler produced no output for block at 0x{0:08X}")]
    EncoderNoOutput(u32),

    #[error("Assembler failed for block at 0x{base:08X}: {detail}")]
    EncoderFailed { base: u32, detail: String },

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to read {0}")]
    FileRead(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),

    #[error("{source}")]
    At {
        file: String,
        line: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the originating file and 0-based line index to a build error.
    pub fn at(self, file: &str, line: usize) -> Error {
        match self {
            already @ Error::At { .. } => already,
            other => Error::At {
                file: file.to_string(),
                line,
                source: Box::new(other),
            },
        }
    }

    /// Print the error with diagnostic information showing the file location
    pub fn print_diag(&self) {
        match self {
            Error::At { file, line, source } => {
                cprintln!("<red,bold>error</>: {}", source);
                cprintln!("     <blue>--></> <underline>{}:{}</>", file, line + 1);
            }
            other => cprintln!("<red,bold>error</>: {}", other),
        }
    }
}
