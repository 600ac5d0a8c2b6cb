use std::fs::File;
use std::io::{prelude::*, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use crate::frame::Bitmap;

const MAGIC_NUMBER: &[u8] = b"P3";

/// Writes `bitmap` as a plain-text PPM. Alpha is dropped, so transparent pixels come out black.
pub fn write_ppm<W: Write>(writer: &mut W, bitmap: &Bitmap) -> Result<()> {
    let width = bitmap.width() as usize;

    writer.write_all(MAGIC_NUMBER)?;
    writer.write_all(b"\n")?;
    writer.write_all(format!("{} {}", bitmap.width(), bitmap.height()).as_bytes())?;
    writer.write_all(b" 255")?;
    writer.write_all(b"\n")?;

    if width == 0 {
        return Ok(());
    }

    for row in bitmap.as_rgba().chunks(width * 4) {
        row.chunks_exact(4).enumerate().try_for_each(|(i, pixel)| -> Result<()> {
            let [red, green, blue] = [pixel[0], pixel[1], pixel[2]];

            writer.write_all(format!("{: >3} {: >3} {: >3}", red, green, blue).as_bytes())?;
            if i != width - 1 {
                writer.write_all(b" ")?;
            }
            Ok(())
        })?;
        writer.write_all(b"\n")?;
    }

    Ok(())
}

pub fn save_ppm(path: impl AsRef<Path>, bitmap: &Bitmap) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("create '{}'", path.display()))?;

    let mut writer = BufWriter::new(file);
    write_ppm(&mut writer, bitmap)?;
    writer.flush()?;
    Ok(())
}
