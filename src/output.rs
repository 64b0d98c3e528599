use crate::assemble::BlockPatch;
use crate::error::Error;
use crate::region::Region;
use std::fs;
use std::path::Path;

/// Render the Riivolution document: one memory-patch record per non-empty
/// block, in block order.
pub fn riivolution_document(patches: &[BlockPatch]) -> String {
    let mut doc = String::new();
    for patch in patches {
        if let Some(memory) = &patch.memory {
            doc.push_str(memory);
            doc.push('\n');
        }
    }
    doc
}

/// Render the Dolphin INI document: every block's dword lines inside an
/// `[OnFrame]` section, enabled by default.
pub fn dolphin_document(patches: &[BlockPatch], name: &str) -> String {
    let mut lines = vec!["[OnFrame]".to_string(), format!("${}", name)];
    for patch in patches {
        lines.extend(patch.dolphin.iter().cloned());
    }
    lines.push(String::new());
    lines.push("[OnFrame_Enabled]".to_string());
    lines.push(format!("${}", name));
    lines.push(String::new());
    lines.join("\n")
}

/// Write both documents under `<build>/<Region>_Riivolution` and
/// `<build>/<Region>_Dolphin`, replacing any stale output first. Called
/// only after every block assembled, so a failed build writes nothing.
pub fn write_outputs(
    build_dir: &Path,
    region: Region,
    name: &str,
    game_code: &str,
    riivolution: &str,
    dolphin: &str,
) -> Result<(), Error> {
    let riivo_dir = build_dir.join(format!("{}_Riivolution", region.full()));
    let dolphin_dir = build_dir.join(format!("{}_Dolphin", region.full()));
    for dir in [&riivo_dir, &dolphin_dir] {
        if dir.exists() {
            fs::remove_dir_all(dir)
                .map_err(|e| Error::FileWrite(dir.display().to_string(), e))?;
        }
        fs::create_dir_all(dir).map_err(|e| Error::FileWrite(dir.display().to_string(), e))?;
    }

    let xml = riivo_dir.join(format!(
        "{}_v{}_{}.xml",
        name,
        env!("CARGO_PKG_VERSION"),
        region.full()
    ));
    fs::write(&xml, riivolution).map_err(|e| Error::FileWrite(xml.display().to_string(), e))?;

    let ini = dolphin_dir.join(format!("{}{}01.ini", game_code, region.short()));
    fs::write(&ini, dolphin).map_err(|e| Error::FileWrite(ini.display().to_string(), e))?;
    Ok(())
}

/// Copy an auxiliary resource tree next to the generated patches.
pub fn copy_resources(source: &Path, dest: &Path) -> Result<(), Error> {
    fs::create_dir_all(dest).map_err(|e| Error::FileWrite(dest.display().to_string(), e))?;
    let entries =
        fs::read_dir(source).map_err(|e| Error::FileOpen(source.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::FileRead(source.display().to_string(), e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_resources(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| Error::FileWrite(to.display().to_string(), e))?;
        }
    }
    Ok(())
}
