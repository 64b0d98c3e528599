use crate::error::Error;
use crate::relocate::Block;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::thread;

/// Byte offset of the first instruction word inside the assembler's
/// relocatable output artifact.
pub const CODE_OFFSET: usize = 0x34;

/// The external instruction encoder. The production implementation spawns
/// `powerpc-eabi-as`; tests substitute a fake so the core pipeline runs
/// without a toolchain installed.
pub trait Encoder: Sync {
    /// Assemble one block and return exactly `block.words * 4` bytes of
    /// big-endian instruction words.
    fn encode(&self, index: usize, block: &Block) -> Result<Vec<u8>, Error>;
}

/// Invokes the GNU PowerPC assembler with private scratch files per block,
/// so concurrent invocations never share state.
pub struct PpcAs {
    pub assembler: PathBuf,
    pub work_dir: PathBuf,
}

impl Encoder for PpcAs {
    fn encode(&self, index: usize, block: &Block) -> Result<Vec<u8>, Error> {
        let source = self.work_dir.join(format!("{}.s", index));
        let object = self.work_dir.join(format!("{}.o", index));

        fs::write(&source, &block.text)
            .map_err(|e| Error::FileWrite(source.display().to_string(), e))?;

        let output = Command::new(&self.assembler)
            .args(["-mbig", "-mregnames", "-mbroadway"])
            .arg(&source)
            .arg("-o")
            .arg(&object)
            .output()
            .map_err(|e| Error::EncoderFailed {
                base: block.base,
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::EncoderFailed {
                base: block.base,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !object.exists() {
            return Err(Error::EncoderNoOutput(block.base));
        }

        let data =
            fs::read(&object).map_err(|e| Error::FileRead(object.display().to_string(), e))?;
        let _ = fs::remove_file(&source);
        let _ = fs::remove_file(&object);

        let end = CODE_OFFSET + block.words * 4;
        if data.len() < end {
            return Err(Error::EncoderFailed {
                base: block.base,
                detail: format!(
                    "output artifact holds {} bytes, expected at least {}",
                    data.len(),
                    end
                ),
            });
        }
        Ok(data[CODE_OFFSET..end].to_vec())
    }
}

/// The two patch-format fragments produced from one block. `memory` is a
/// Riivolution memory-patch record, absent when every word was trashed.
#[derive(Debug)]
pub struct BlockPatch {
    pub base: u32,
    pub memory: Option<String>,
    pub dolphin: Vec<String>,
}

/// Filter trashed addresses out of a block's assembled words and render the
/// surviving words into both patch formats.
pub fn extract(block: &Block, words: &[u8], trash: &HashSet<u32>) -> BlockPatch {
    let mut value = String::new();
    let mut dolphin = Vec::new();
    let mut addr = block.base;
    for chunk in words.chunks_exact(4) {
        let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !trash.contains(&addr) {
            value.push_str(&format!("{:08X}", word));
            dolphin.push(format!("0x{:08X}:dword:0x{:08X}", addr, word));
        }
        addr = addr.wrapping_add(4);
    }
    let memory = if value.is_empty() {
        None
    } else {
        Some(format!(
            "<memory offset=\"0x{:08X}\" value=\"{}\" />",
            block.base, value
        ))
    };
    BlockPatch {
        base: block.base,
        memory,
        dolphin,
    }
}

/// Assemble every block concurrently, one thread per block, and hand back
/// the extracted patches in block-index order regardless of completion
/// order. Any failed block aborts the whole build.
pub fn assemble_all<E: Encoder>(
    blocks: &[Block],
    encoder: &E,
    trash: &HashSet<u32>,
) -> Result<Vec<BlockPatch>, Error> {
    thread::scope(|scope| {
        let handles: Vec<_> = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                scope.spawn(move || {
                    encoder
                        .encode(index, block)
                        .map(|words| extract(block, &words, trash))
                })
            })
            .collect();

        let mut patches = Vec::with_capacity(handles.len());
        for handle in handles {
            patches.push(handle.join().expect("assembler thread panicked")?);
        }
        Ok(patches)
    })
}
