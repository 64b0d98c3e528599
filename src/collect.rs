use crate::error::Error;
use crate::literal::{is_double, parse_string_line};
use crate::msg::Msg;
use crate::region::Region;
use crate::resolve::{apply_offsets, resolve};
use crate::source::SourceLine;
use crate::table::{AddressMap, Labels, Symbols, Variables};
use std::collections::HashSet;

/// Reserved prefix introducing a directive line.
pub const DIRECTIVE: &str = ".PATCH";

/// Allowed overshoot (in address units) past an `ASSERT` target before the
/// build aborts instead of warning.
pub const ASSERT_SLACK: u32 = 1000;

/// Mutable build state shared by the sequential collection pass and frozen
/// before relocation starts.
pub struct Build {
    pub code: AddressMap,
    pub labels: Labels,
    pub variables: Variables,
    pub trash: HashSet<u32>,
    /// Metadata accumulated from BINDING / HOOK directives. Not consumed by
    /// code generation; kept so a future binding generator can pick it up.
    pub bindings: Vec<String>,
}

impl Build {
    pub fn new() -> Self {
        Build {
            code: AddressMap::new(),
            labels: Labels::new(),
            variables: Variables::new(),
            trash: HashSet::new(),
            bindings: Vec::new(),
        }
    }

    /// Freeze the tables after all fragments are collected: variables whose
    /// value is exactly a label name become that label's address literal, so
    /// later passes can treat them as plain hex.
    pub fn freeze(&mut self) {
        let rewrites: Vec<(String, String)> = self
            .variables
            .iter()
            .filter_map(|(name, value)| {
                self.labels
                    .get(value)
                    .map(|addr| (name.clone(), format!("0x{:08X}", addr)))
            })
            .collect();
        for (name, value) in rewrites {
            self.variables.set_value(&name, value);
        }
    }
}

impl Default for Build {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of collecting one fragment.
#[derive(Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// The fragment opened with `.PATCH IGNORE` and contributed nothing.
    Skip,
}

/// Walk one fragment, interpreting directives and assigning addresses to
/// code lines. Fragments must be visited in a fixed order; the shared
/// tables make this pass strictly sequential.
pub fn collect_fragment(
    build: &mut Build,
    symbols: &Symbols,
    region: Region,
    file: &str,
    lines: &[String],
) -> Result<Status, Error> {
    let mut stack: Vec<u32> = Vec::new();
    let mut cursor: u32 = 0;
    let mut active = true;
    let mut trashing = false;

    for (idx, raw) in lines.iter().enumerate() {
        let raw = raw.as_str();
        if raw.starts_with(DIRECTIVE) {
            let split: Vec<&str> = raw.split_whitespace().collect();
            let verb = *split.get(1).ok_or_else(|| {
                Error::MalformedDirective("missing directive verb".to_string()).at(file, idx)
            })?;

            match verb {
                "IGNORE" => {
                    if idx == 0 {
                        return Ok(Status::Skip);
                    }
                    return Err(Error::InvalidIgnore.at(file, idx));
                }
                "PRINTADDRESS" => {
                    Msg::Note(format!("current address is 0x{:08X}", cursor)).diag((
                        file, idx, raw,
                    ));
                }
                "PRINTMESSAGE" => match raw.splitn(3, char::is_whitespace).nth(2) {
                    Some(text) => println!("{}", text),
                    None => Msg::Warn("PRINTMESSAGE without a message".to_string())
                        .diag((file, idx, raw)),
                },
                "BINDING" | "HOOK" => match raw.splitn(3, char::is_whitespace).nth(2) {
                    Some(text) => build.bindings.push(format!("{} {}", verb, text)),
                    None => Msg::Warn(format!("{} without a description", verb))
                        .diag((file, idx, raw)),
                },
                "REGION" => {
                    let name = *split.get(2).ok_or_else(|| {
                        Error::MalformedDirective("REGION needs a region name or END".to_string())
                            .at(file, idx)
                    })?;
                    active = name == "END" || region.matches(name);
                }
                // Directives below only apply while the region is active.
                _ if !active => {}
                "ADDRESS" => {
                    let token = *split.get(2).ok_or_else(|| {
                        Error::MalformedDirective("ADDRESS needs a target".to_string())
                            .at(file, idx)
                    })?;
                    let base = resolve(token, &build.variables, symbols, &build.labels)
                        .map_err(|e| e.at(file, idx))?;
                    let target =
                        apply_offsets(base, &split[3..]).map_err(|e| e.at(file, idx))?;
                    if cursor != 0 {
                        stack.push(cursor);
                    }
                    cursor = target;
                }
                "ENDADDRESS" => {
                    // Unmatched ENDADDRESS is a silent no-op.
                    if let Some(resume) = stack.pop() {
                        cursor = resume;
                    }
                }
                "ASSERT" => {
                    let token = *split.get(2).ok_or_else(|| {
                        Error::MalformedDirective("ASSERT needs a target".to_string())
                            .at(file, idx)
                    })?;
                    let base = resolve(token, &build.variables, symbols, &build.labels)
                        .map_err(|e| e.at(file, idx))?;
                    let target =
                        apply_offsets(base, &split[3..]).map_err(|e| e.at(file, idx))?;
                    if cursor > target {
                        let over = cursor - target;
                        if over > ASSERT_SLACK {
                            return Err(Error::AssertOverrun { target, over }.at(file, idx));
                        }
                        Msg::Warn(format!(
                            "code ends 0x{:X} past 0x{:08X}, possible misalignment",
                            over, target
                        ))
                        .diag((file, idx, raw));
                    } else if cursor == target {
                        Msg::Note(format!(
                            "no space left for code before 0x{:08X} (still in bounds)",
                            target
                        ))
                        .diag((file, idx, raw));
                    }
                }
                "TRASH" => match split.get(2) {
                    Some(&"BEGIN") => trashing = true,
                    Some(&"END") => trashing = false,
                    _ => {
                        return Err(Error::MalformedDirective(
                            "TRASH needs BEGIN or END".to_string(),
                        )
                        .at(file, idx))
                    }
                },
                other => {
                    return Err(
                        Error::MalformedDirective(format!("unknown directive `{}`", other))
                            .at(file, idx),
                    )
                }
            }
            continue;
        }

        if raw.trim().is_empty() || raw.starts_with('#') || !active {
            continue;
        }

        if let Some(name) = as_label(raw) {
            build
                .labels
                .insert(name, cursor, location(file, idx))
                .map_err(|e| e.at(file, idx))?;
            continue;
        }

        if let Some((name, value)) = as_variable(raw) {
            build
                .variables
                .insert(name, value, location(file, idx))
                .map_err(|e| e.at(file, idx))?;
            continue;
        }

        // Code or data: claims address space.
        if let Some(existing) = build.code.get(&cursor) {
            return Err(Error::DuplicateAddress {
                addr: cursor,
                first: existing.location(),
            }
            .at(file, idx));
        }

        let advance = if let Some(parsed) = parse_string_line(raw) {
            let data = parsed.map_err(|e| e.at(file, idx))?;
            let count = data.byte_count(cursor);
            if trashing {
                for offset in 0..count as u32 {
                    build.trash.insert(cursor.wrapping_add(offset));
                }
            }
            count as u32
        } else if is_double(raw) {
            if trashing {
                build.trash.insert(cursor);
                build.trash.insert(cursor.wrapping_add(4));
            }
            8
        } else {
            if trashing {
                build.trash.insert(cursor);
            }
            4
        };

        build.code.insert(
            cursor,
            SourceLine {
                text: raw.to_string(),
                file: file.to_string(),
                line: idx,
            },
        );
        cursor = cursor.wrapping_add(advance);
    }

    Ok(Status::Ok)
}

fn location(file: &str, idx: usize) -> String {
    format!("{}, line {}", file, idx + 1)
}

/// `Foo:` (optionally followed by a `#` comment) defines a label. Labels
/// consume no address space.
fn as_label(line: &str) -> Option<&str> {
    let mut text = line.trim_end();
    if let Some(pos) = text.find('#') {
        let before = text[..pos].trim_end();
        if before.ends_with(':') {
            text = before;
        }
    }
    let name = text.strip_suffix(':')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name)
}

/// `.set name, value` defines a variable. Consumes no address space.
fn as_variable(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix(".set ")?;
    let (name, value) = rest.split_once(',')?;
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name, value))
}
