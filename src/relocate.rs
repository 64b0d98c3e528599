use crate::collect::Build;
use crate::error::Error;
use crate::literal::{is_double, parse_string_line};
use crate::source::SourceLine;
use crate::table::Symbols;

/// Branch mnemonics whose operand is rewritten to a PC-relative offset.
/// Anything else passes through to the external assembler untouched.
const BRANCHES: [&str; 23] = [
    "b", "bl", "ble", "blt", "beq", "bne", "bge", "bgt", //
    "ble+", "blt+", "beq+", "bne+", "bge+", "bgt+", //
    "ble-", "blt-", "beq-", "bne-", "bge-", "bgt-", //
    "bdnz", "bdnz-", "bdnz+",
];

/// Absolute branch targets outside this window are assumed to already be
/// offsets and are left alone.
const CODE_RANGE: (u32, u32) = (0x8000_0000, 0xFE00_0000);

/// One maximal run of contiguous addresses, prepared as a self-contained
/// compilation unit for the external assembler. `text` starts with a
/// `#XXXXXXXX` marker recording `base`; `words` is the number of 32-bit
/// words the assembled output must contain.
#[derive(Debug)]
pub struct Block {
    pub base: u32,
    pub text: String,
    pub words: usize,
}

struct OpenBlock {
    base: u32,
    text: String,
    /// Names already bound with `.set` in this block, in first-use order.
    in_use: Vec<String>,
}

/// Consume the frozen address map in ascending order and emit one block per
/// contiguous address run, relocating branches and encoding data lines
/// along the way.
pub fn split_blocks(build: &Build, symbols: &Symbols) -> Result<Vec<Block>, Error> {
    let mut blocks = Vec::new();
    let mut open: Option<OpenBlock> = None;
    let mut cursor: u32 = 0;

    for (&addr, line) in &build.code {
        if open.is_none() || addr != cursor {
            if let Some(done) = open.take() {
                blocks.push(close(done, cursor));
            }
            open = Some(OpenBlock {
                base: addr,
                text: format!("#{:08X}\n", addr),
                in_use: Vec::new(),
            });
            cursor = addr;
        }
        if let Some(block) = open.as_mut() {
            let advance = emit_line(block, addr, line, build, symbols)
                .map_err(|e| e.at(&line.file, line.line))?;
            cursor = cursor.wrapping_add(advance);
        }
    }
    if let Some(done) = open.take() {
        blocks.push(close(done, cursor));
    }
    Ok(blocks)
}

fn close(block: OpenBlock, end: u32) -> Block {
    Block {
        base: block.base,
        words: (end.wrapping_sub(block.base) / 4) as usize,
        text: block.text,
    }
}

/// Relocate one line into `block`, returning how many bytes it occupies.
fn emit_line(
    block: &mut OpenBlock,
    addr: u32,
    line: &SourceLine,
    build: &Build,
    symbols: &Symbols,
) -> Result<u32, Error> {
    let code = line.text.trim_start();
    let mut parts = code.split_whitespace();
    let mnemonic = parts.next().unwrap_or("");

    // Branches become PC-relative offsets (target - own address) and end up
    // fully literal, so they bind no constants.
    if BRANCHES.contains(&mnemonic) {
        let target = parts
            .next()
            .ok_or_else(|| Error::InvalidBranch(code.to_string()))?;
        let target = build.variables.substitute(target);
        let rewritten = if let Some(value) = parse_hex(target) {
            if value > CODE_RANGE.0 && value < CODE_RANGE.1 {
                format!("{} 0x{:08X}", mnemonic, value.wrapping_sub(addr))
            } else {
                code.to_string()
            }
        } else if let Some(dest) = symbols.get(target).or_else(|| build.labels.get(target)) {
            format!("{} 0x{:08X}", mnemonic, dest.wrapping_sub(addr))
        } else {
            return Err(Error::InvalidBranch(target.to_string()));
        };
        block.text.push_str(&rewritten);
        block.text.push('\n');
        return Ok(4);
    }

    // String data expands to explicit byte directives so the external
    // assembler never sees the original encoding.
    if let Some(parsed) = parse_string_line(&line.text) {
        let data = parsed?;
        let mut count = 0usize;
        for byte in &data.bytes {
            block.text.push_str(&format!(".byte 0x{:02X}\n", byte));
            count += 1;
        }
        for _ in 0..data.stride {
            block.text.push_str(".byte 0x00\n");
            count += 1;
        }
        if data.auto {
            while (addr as usize + count) % 4 != 0 {
                block.text.push_str(".byte 0x00\n");
                count += 1;
            }
        }
        return Ok(count as u32);
    }

    let mut fixed = code.to_string();

    // `.int` takes the integer value of variables, labels and symbols.
    if let Some(token) = code.strip_prefix(".int ") {
        let token = token.trim();
        let mut value = build.variables.substitute(token).to_string();
        if let Some(label) = build.labels.get(&value) {
            value = format!("0x{:08X}", label);
        } else if let Some(symbol) = symbols.get(&value) {
            value = format!("0x{:08X}", symbol);
        }
        fixed = format!(".int {}", value);
    }

    // The assembler rejects add-immediates past the signed 16-bit range but
    // accepts the equivalent negated subtract-immediate.
    if fixed.starts_with("addi ") {
        let parts: Vec<&str> = fixed.split(',').map(str::trim).collect();
        if parts.len() >= 3 && !parts[2].contains('@') {
            if let Some(value) = parse_hex(parts[2]) {
                if value > 0x7FFF {
                    let negated = (value | 0xFFFF_0000).wrapping_neg();
                    fixed = format!(
                        "{}, {}, 0x{:08X}",
                        parts[0].replacen("addi", "subi", 1),
                        parts[1],
                        negated
                    );
                }
            }
        }
    }

    let advance = if is_double(&fixed) { 8 } else { 4 };

    // Bind every name the line mentions before the line itself, so each
    // block assembles with no forward references.
    materialize(block, &fixed, build, symbols)?;
    block.text.push_str(&fixed);
    block.text.push('\n');
    Ok(advance)
}

fn parse_hex(token: &str) -> Option<u32> {
    let digits = token.strip_prefix("0x")?;
    u32::from_str_radix(digits, 16).ok()
}

/// Emit a `.set` binding for every variable, label or symbol name that
/// textually appears in `fixed` and is not bound in this block yet.
fn materialize(
    block: &mut OpenBlock,
    fixed: &str,
    build: &Build,
    symbols: &Symbols,
) -> Result<(), Error> {
    for (name, value) in build.variables.iter() {
        if fixed.contains(name.as_str()) && !block.in_use.contains(name) {
            block.in_use.push(name.clone());
            let mut visiting = Vec::new();
            emit_variable(block, name, value, build, &mut visiting)?;
        }
    }
    for (name, addr) in build.labels.iter() {
        if fixed.contains(name.as_str()) && !block.in_use.contains(name) {
            block.in_use.push(name.clone());
            block
                .text
                .push_str(&format!(".set {}, 0x{:08X}\n", name, addr));
        }
    }
    for (name, addr) in symbols.iter() {
        if fixed.contains(name.as_str()) && !block.in_use.contains(name) {
            block.in_use.push(name.clone());
            block
                .text
                .push_str(&format!(".set {}, 0x{:08X}\n", name, addr));
        }
    }
    Ok(())
}

/// Variables may reference other variables; expand depth-first so every
/// binding only uses names bound above it. `visiting` tracks the expansion
/// stack to turn definition cycles into an error instead of a hang.
fn emit_variable(
    block: &mut OpenBlock,
    name: &str,
    value: &str,
    build: &Build,
    visiting: &mut Vec<String>,
) -> Result<(), Error> {
    visiting.push(name.to_string());
    for (other, other_value) in build.variables.iter() {
        if other.as_str() == name || !value.contains(other.as_str()) {
            continue;
        }
        if block.in_use.contains(other) {
            if visiting.contains(other) {
                return Err(Error::VariableCycle(other.clone()));
            }
            continue;
        }
        block.in_use.push(other.clone());
        emit_variable(block, other, other_value, build, visiting)?;
    }
    visiting.pop();
    block.text.push_str(&format!(".set {}, {}\n", name, value));
    Ok(())
}
