use crate::error::Error;
use crate::region::Region;
use crate::source::SourceLine;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Ascending address -> source line map. Keys are unique across the whole
/// build; the inserting pass rejects collisions before they reach here.
pub type AddressMap = BTreeMap<u32, SourceLine>;

// ----------------------------------------------------------------------------
// Labels

/// Labels defined in source (`Foo:`), resolved like symbols but scoped to
/// the build. Duplicate names are fatal; the first definition site is kept
/// for the error message.
pub struct Labels(IndexMap<String, (u32, String)>);

impl Labels {
    pub fn new() -> Self {
        Labels(IndexMap::new())
    }

    pub fn insert(&mut self, name: &str, addr: u32, location: String) -> Result<(), Error> {
        if let Some((_, first)) = self.0.get(name) {
            return Err(Error::DuplicateLabel {
                name: name.to_string(),
                first: first.clone(),
            });
        }
        self.0.insert(name.to_string(), (addr, location));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.get(name).map(|(addr, _)| *addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, u32)> {
        self.0.iter().map(|(name, (addr, _))| (name, *addr))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Variables

/// `.set name, value` declarations. Values are raw replacement text and may
/// reference other variables; expansion happens at materialization time.
pub struct Variables(IndexMap<String, (String, String)>);

impl Variables {
    pub fn new() -> Self {
        Variables(IndexMap::new())
    }

    pub fn insert(&mut self, name: &str, value: &str, location: String) -> Result<(), Error> {
        if let Some((_, first)) = self.0.get(name) {
            return Err(Error::DuplicateVariable {
                name: name.to_string(),
                first: first.clone(),
            });
        }
        self.0.insert(name.to_string(), (value.to_string(), location));
        Ok(())
    }

    /// Overwrite an existing value; used by the freeze step that rewrites
    /// label-valued variables into hex literals.
    pub fn set_value(&mut self, name: &str, value: String) {
        if let Some((old, _)) = self.0.get_mut(name) {
            *old = value;
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|(value, _)| value.as_str())
    }

    /// Single-level substitution: replace a whole token that names a
    /// variable with its value text, otherwise return the token unchanged.
    pub fn substitute<'a>(&'a self, token: &'a str) -> &'a str {
        self.get(token).unwrap_or(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter().map(|(name, (value, _))| (name, value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Variables {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Symbols

/// Externally supplied name -> address bindings, loaded once per region
/// from `<dir>/<Region>.txt` (`name=0xHHHHHHHH` per line). Read-only to the
/// rest of the build.
pub struct Symbols(IndexMap<String, u32>);

impl Symbols {
    pub fn new() -> Self {
        Symbols(IndexMap::new())
    }

    pub fn insert(&mut self, name: &str, addr: u32) {
        self.0.insert(name.to_string(), addr);
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, u32)> {
        self.0.iter().map(|(name, addr)| (name, *addr))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn load_for(dir: &Path, region: Region) -> Result<Symbols, Error> {
        Self::load(&dir.join(format!("{}.txt", region.full())))
    }

    pub fn load(path: &Path) -> Result<Symbols, Error> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::FileOpen(path.display().to_string(), e))?;
        let mut symbols = Symbols::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once('=')
                .ok_or_else(|| Error::MalformedSymbol(line.to_string()))?;
            let digits = value
                .strip_prefix("0x")
                .ok_or_else(|| Error::MalformedSymbol(line.to_string()))?;
            let addr = u32::from_str_radix(digits, 16)
                .map_err(|_| Error::MalformedSymbol(line.to_string()))?;
            symbols.insert(name, addr);
        }
        Ok(symbols)
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::new()
    }
}
