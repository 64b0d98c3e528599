use crate::error::Error;
use crate::table::{Labels, Symbols, Variables};

/// Resolve one token to a 32-bit address: variable substitution first, then
/// `0x` literal, then the external symbol table, then the label table.
pub fn resolve(
    token: &str,
    variables: &Variables,
    symbols: &Symbols,
    labels: &Labels,
) -> Result<u32, Error> {
    let token = variables.substitute(token);
    if let Some(digits) = token.strip_prefix("0x") {
        return u32::from_str_radix(digits, 16).map_err(|_| Error::InvalidNumber(token.to_string()));
    }
    if let Some(addr) = symbols.get(token) {
        return Ok(addr);
    }
    if let Some(addr) = labels.get(token) {
        return Ok(addr);
    }
    Err(Error::UnresolvedReference(token.to_string()))
}

/// Apply chained `+0xNN` / `-0xNN` offset tokens left-to-right with
/// wrapping u32 arithmetic.
pub fn apply_offsets(base: u32, ops: &[&str]) -> Result<u32, Error> {
    let mut value = base;
    for op in ops {
        let rest = op.get(1..).unwrap_or("");
        let digits = rest
            .strip_prefix("0x")
            .ok_or_else(|| Error::InvalidNumber(op.to_string()))?;
        let n = u32::from_str_radix(digits, 16).map_err(|_| Error::InvalidNumber(op.to_string()))?;
        value = match op.as_bytes()[0] {
            b'+' => value.wrapping_add(n),
            b'-' => value.wrapping_sub(n),
            _ => return Err(Error::InvalidNumber(op.to_string())),
        };
    }
    Ok(value)
}
