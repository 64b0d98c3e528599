use ppclink::{
    assemble_all, collect_fragment, dolphin_document, extract, riivolution_document,
    split_blocks, write_outputs, Block, Build, Encoder, Error, Region, Status, Symbols,
};
use std::thread;
use std::time::Duration;

/// Stand-in for the external assembler: every word is derived from its
/// slot, so tests can tell which word landed where. Sleeps longer for
/// earlier blocks so completion order is the reverse of block order.
struct FakeEncoder {
    blocks: usize,
}

impl Encoder for FakeEncoder {
    fn encode(&self, index: usize, block: &Block) -> Result<Vec<u8>, Error> {
        thread::sleep(Duration::from_millis(
            10 * (self.blocks - index) as u64,
        ));
        let mut bytes = Vec::with_capacity(block.words * 4);
        for word in 0..block.words as u32 {
            bytes.extend(((index as u32) << 16 | word).to_be_bytes());
        }
        Ok(bytes)
    }
}

/// An encoder that always fails, to check fail-fast behavior.
struct BrokenEncoder;

impl Encoder for BrokenEncoder {
    fn encode(&self, _index: usize, block: &Block) -> Result<Vec<u8>, Error> {
        Err(Error::EncoderNoOutput(block.base))
    }
}

fn build_from(text: &[&str]) -> (Build, Symbols) {
    let symbols = Symbols::new();
    let lines: Vec<String> = text.iter().map(|s| s.to_string()).collect();
    let mut build = Build::new();
    let status =
        collect_fragment(&mut build, &symbols, Region::NtscU, "test.s", &lines).unwrap();
    assert_eq!(status, Status::Ok);
    build.freeze();
    (build, symbols)
}

#[test]
fn block_order_survives_reversed_completion() {
    let (build, symbols) = build_from(&[
        ".PATCH ADDRESS 0x80001000",
        "nop",
        ".PATCH ADDRESS 0x80002000",
        "nop",
        ".PATCH ADDRESS 0x80003000",
        "nop",
        ".PATCH ADDRESS 0x80004000",
        "nop",
    ]);
    let blocks = split_blocks(&build, &symbols).unwrap();
    assert_eq!(blocks.len(), 4);

    let encoder = FakeEncoder { blocks: blocks.len() };
    let patches = assemble_all(&blocks, &encoder, &build.trash).unwrap();
    let bases: Vec<u32> = patches.iter().map(|p| p.base).collect();
    assert_eq!(bases, vec![0x80001000, 0x80002000, 0x80003000, 0x80004000]);

    // the dolphin document lists records in ascending block order
    let doc = dolphin_document(&patches, "test");
    let dwords: Vec<&str> = doc.lines().filter(|l| l.starts_with("0x")).collect();
    assert_eq!(
        dwords,
        vec![
            "0x80001000:dword:0x00000000",
            "0x80002000:dword:0x00010000",
            "0x80003000:dword:0x00020000",
            "0x80004000:dword:0x00030000",
        ]
    );
}

#[test]
fn failed_block_aborts_the_build() {
    let (build, symbols) = build_from(&[".PATCH ADDRESS 0x80001000", "nop"]);
    let blocks = split_blocks(&build, &symbols).unwrap();
    let err = assemble_all(&blocks, &BrokenEncoder, &build.trash).unwrap_err();
    assert!(matches!(err, Error::EncoderNoOutput(0x80001000)));
}

#[test]
fn trashed_words_appear_in_neither_format() {
    let (build, symbols) = build_from(&[
        ".PATCH ADDRESS 0x80001000",
        "nop",
        ".PATCH TRASH BEGIN",
        "nop",
        ".PATCH TRASH END",
        "nop",
    ]);
    let blocks = split_blocks(&build, &symbols).unwrap();
    assert_eq!(blocks[0].words, 3);

    let encoder = FakeEncoder { blocks: 1 };
    let patches = assemble_all(&blocks, &encoder, &build.trash).unwrap();

    // word 1 (0x80001004) is trashed; its siblings keep their own values
    let memory = patches[0].memory.as_deref().unwrap();
    assert_eq!(
        memory,
        "<memory offset=\"0x80001000\" value=\"0000000000000002\" />"
    );
    assert_eq!(
        patches[0].dolphin,
        vec![
            "0x80001000:dword:0x00000000",
            "0x80001008:dword:0x00000002",
        ]
    );
}

#[test]
fn fully_trashed_block_emits_no_memory_record() {
    let (build, symbols) = build_from(&[
        ".PATCH ADDRESS 0x80001000",
        ".PATCH TRASH BEGIN",
        "nop",
        "nop",
        ".PATCH TRASH END",
    ]);
    let blocks = split_blocks(&build, &symbols).unwrap();
    let words = vec![0u8; blocks[0].words * 4];
    let patch = extract(&blocks[0], &words, &build.trash);
    assert!(patch.memory.is_none());
    assert!(patch.dolphin.is_empty());
    assert_eq!(riivolution_document(&[patch]), "");
}

#[test]
fn dolphin_document_shape() {
    let (build, symbols) = build_from(&[".PATCH ADDRESS 0x80001000", "nop"]);
    let blocks = split_blocks(&build, &symbols).unwrap();
    let encoder = FakeEncoder { blocks: 1 };
    let patches = assemble_all(&blocks, &encoder, &build.trash).unwrap();
    let doc = dolphin_document(&patches, "mypatches");
    let lines: Vec<&str> = doc.lines().collect();
    assert_eq!(lines[0], "[OnFrame]");
    assert_eq!(lines[1], "$mypatches");
    assert_eq!(lines[2], "0x80001000:dword:0x00000000");
    assert_eq!(lines[3], "");
    assert_eq!(lines[4], "[OnFrame_Enabled]");
    assert_eq!(lines[5], "$mypatches");
}

#[test]
fn outputs_land_in_region_directories() {
    let dir = tempfile::tempdir().unwrap();
    let (build, symbols) = build_from(&[".PATCH ADDRESS 0x80001000", "nop"]);
    let blocks = split_blocks(&build, &symbols).unwrap();
    let encoder = FakeEncoder { blocks: 1 };
    let patches = assemble_all(&blocks, &encoder, &build.trash).unwrap();

    let riivolution = riivolution_document(&patches);
    let dolphin = dolphin_document(&patches, "mypatches");
    write_outputs(
        dir.path(),
        Region::Pal,
        "mypatches",
        "SB3",
        &riivolution,
        &dolphin,
    )
    .unwrap();

    let xml = dir.path().join("PAL_Riivolution").join(format!(
        "mypatches_v{}_PAL.xml",
        env!("CARGO_PKG_VERSION")
    ));
    let ini = dir.path().join("PAL_Dolphin").join("SB3P01.ini");
    assert!(xml.exists());
    let written = std::fs::read_to_string(&ini).unwrap();
    assert!(written.starts_with("[OnFrame]"));
}
