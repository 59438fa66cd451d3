use std::{fs, io::Write, path::Path};

/// Write `bytes` to a sibling temp file, fsync, then rename over `path` so a
/// reader never sees a half-written grid export.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}
