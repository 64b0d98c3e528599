mod assemble;
mod collect;
mod error;
mod literal;
mod msg;
mod output;
mod region;
mod relocate;
mod resolve;
mod source;
mod table;

pub use assemble::{assemble_all, extract, BlockPatch, Encoder, PpcAs, CODE_OFFSET};
pub use collect::{collect_fragment, Build, Status, ASSERT_SLACK, DIRECTIVE};
pub use error::Error;
pub use msg::Msg;
pub use output::{copy_resources, dolphin_document, riivolution_document, write_outputs};
pub use region::Region;
pub use relocate::{split_blocks, Block};
pub use resolve::{apply_offsets, resolve};
pub use source::{find_sources, SourceLine};
pub use table::{AddressMap, Labels, Symbols, Variables};
