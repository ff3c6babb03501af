//! PDF figure rasterisation for the DOCX writer, which cannot embed PDF.

use std::cell::OnceCell;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::Builder;

use crate::error::{FilterError, Result};
use crate::plugin::{PandocPlugin, image_source, is_local};

const DPI: &str = "300";

trait PngConvert: Send + Sync + std::fmt::Debug {
    fn supported(&self) -> bool;
    fn convert(&self, pdffile: &Path, pngfile: &Path) -> std::result::Result<(), String>;
}

fn check(output: std::io::Result<Output>) -> std::result::Result<(), String> {
    let output = output.map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

#[derive(Debug)]
struct ImageMagick {}

impl PngConvert for ImageMagick {
    fn supported(&self) -> bool {
        Command::new("magick").arg("-version").output().is_ok()
    }

    fn convert(&self, pdffile: &Path, pngfile: &Path) -> std::result::Result<(), String> {
        // first page only
        let mut page: OsString = pdffile.as_os_str().to_owned();
        page.push("[0]");
        let mut cmd = Command::new("magick");
        cmd.arg("-density").arg(DPI).arg(page).arg(pngfile);
        check(cmd.output())
    }
}

#[derive(Debug)]
struct Pdftoppm {}

impl PngConvert for Pdftoppm {
    fn supported(&self) -> bool {
        Command::new("pdftoppm").arg("-v").output().is_ok()
    }

    fn convert(&self, pdffile: &Path, pngfile: &Path) -> std::result::Result<(), String> {
        // pdftoppm appends the extension itself
        let mut cmd = Command::new("pdftoppm");
        cmd.args(["-png", "-r", DPI, "-singlefile"])
            .arg(pdffile)
            .arg(pngfile.with_extension(""));
        check(cmd.output())
    }
}

#[derive(Debug)]
struct FallbackConverter {}

impl PngConvert for FallbackConverter {
    fn supported(&self) -> bool {
        true
    }

    fn convert(&self, _: &Path, _: &Path) -> std::result::Result<(), String> {
        Err("No supported PDF to PNG converter found".to_owned())
    }
}

#[derive(Debug)]
pub struct PngConverter {
    converter: Box<dyn PngConvert>,
}

impl PngConverter {
    pub fn new() -> Self {
        let converter: Box<dyn PngConvert> = if (ImageMagick {}).supported() {
            Box::new(ImageMagick {})
        } else if (Pdftoppm {}).supported() {
            Box::new(Pdftoppm {})
        } else {
            Box::new(FallbackConverter {})
        };
        log::debug!("PDF figures converted with {converter:?}");
        PngConverter { converter }
    }

    /// Rasterise the first page of `pdffile` into a new file under `tmpdir`
    pub fn to_png(&self, pdffile: &Path, tmpdir: Option<&Path>) -> Result<PathBuf> {
        let dir = tmpdir.map(Path::to_path_buf).unwrap_or_else(env::temp_dir);
        let pngfile = Builder::new()
            .prefix("tmp-manuscript-")
            .suffix(".png")
            // must persist - pandoc will need it beyond our lifetime
            .disable_cleanup(true)
            .tempfile_in(dir)?;
        let pngpath = pngfile.path().to_path_buf();
        drop(pngfile);
        if let Err(e) = self.converter.convert(pdffile, &pngpath) {
            if let Err(rm) = fs::remove_file(&pngpath) {
                log::debug!("Could not remove {}: {rm}", pngpath.display());
            }
            return Err(FilterError::Conversion(format!("{}: {e}", pdffile.display())));
        }
        Ok(pngpath)
    }
}

impl Default for PngConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces local PDF images with PNG renderings.
///
/// A failed conversion keeps the PDF reference and logs a warning, so the
/// document still builds with whatever the writer makes of it.
pub struct PdfToPngPass {
    tmpdir: Option<PathBuf>,
    converter: OnceCell<PngConverter>,
}

impl PdfToPngPass {
    pub fn new(tmpdir: Option<PathBuf>) -> Self {
        PdfToPngPass {
            tmpdir,
            converter: OnceCell::new(),
        }
    }
}

impl PandocPlugin for PdfToPngPass {
    fn rewrite(&mut self, list: &mut Vec<Value>, index: usize) -> Option<usize> {
        let source = image_source(&mut list[index])?;
        let is_pdf = Path::new(source.as_str())
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && is_local(source) {
            match self
                .converter
                .get_or_init(PngConverter::new)
                .to_png(Path::new(source.as_str()), self.tmpdir.as_deref())
            {
                Ok(pngfile) => *source = pngfile.to_string_lossy().into_owned(),
                Err(e) => log::warn!("PNG conversion failed, keeping PDF: {e}"),
            }
        }
        Some(1)
    }
}
