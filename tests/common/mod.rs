//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_pair_compare::core::extract::{PageSelection, Rasterizer};
use pdf_pair_compare::error::ExtractError;
use std::path::{Path, PathBuf};

/// Write a PDF with one page per entry, each page showing its lines in Courier
pub fn write_text_pdf(dir: &Path, name: &str, pages: &[&[&str]]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in lines.iter() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Write a stand-in "PDF" understood by [`SwatchRasterizer`]:
/// `color` is `r,g,b`, one solid page per entry in `pages`
pub fn write_swatch(dir: &Path, name: &str, pages: &[[u8; 3]]) -> PathBuf {
    let body = pages
        .iter()
        .map(|[r, g, b]| format!("{},{},{}", r, g, b))
        .collect::<Vec<_>>()
        .join("\n");

    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Renders swatch files into solid 8x8 PNG pages, no poppler needed.
///
/// Any line that is not `r,g,b` fails the render like a broken PDF would.
pub struct SwatchRasterizer;

pub const SWATCH_SIDE: u32 = 8;

impl Rasterizer for SwatchRasterizer {
    fn render(
        &self,
        pdf: &Path,
        pages: PageSelection,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let body = std::fs::read_to_string(pdf).map_err(|source| ExtractError::Io {
            path: pdf.to_path_buf(),
            source,
        })?;

        let limit = pages.limit().unwrap_or(usize::MAX);
        body.lines()
            .take(limit)
            .enumerate()
            .map(|(index, line)| {
                let color = parse_color(line).ok_or_else(|| ExtractError::Conversion {
                    path: pdf.to_path_buf(),
                    reason: format!("not a swatch: {:?}", line),
                })?;
                let image = RgbaImage::from_pixel(SWATCH_SIDE, SWATCH_SIDE, color);
                let path = out_dir.join(format!("page-{}.png", index + 1));
                image.save(&path).map_err(|e| ExtractError::Conversion {
                    path: pdf.to_path_buf(),
                    reason: e.to_string(),
                })?;
                Ok(path)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "swatch"
    }
}

fn parse_color(line: &str) -> Option<Rgba<u8>> {
    let channels = line
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;
    match channels.as_slice() {
        [r, g, b] => Some(Rgba([*r, *g, *b, 255])),
        _ => None,
    }
}

/// Lines of a CSV file, header included
pub fn csv_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
