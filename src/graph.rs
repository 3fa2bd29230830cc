use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::f64::consts::PI;
use std::ops::Range;

use crate::encode::EncodingMap;
use crate::ir::{ChartDescriptor, ChartKind, Payload};
use crate::{OutputFormat, RenderOptions};

const BAR_COLOR: RGBColor = BLUE;
const LINE_COLOR: RGBColor = BLUE;

/// Largest width or height accepted for a rendered image
pub const MAX_DIMENSION: u32 = 16_384;

/// Draw one descriptor and encode it in the configured format
pub fn render_descriptor(descriptor: &ChartDescriptor, options: &RenderOptions) -> Result<Vec<u8>> {
    if descriptor.payload.is_empty() {
        anyhow::bail!("Cannot render '{}' with no data points", descriptor.title);
    }

    let (width, height) = (options.width, options.height);
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        anyhow::bail!(
            "Image size {}x{} is outside 1..={} pixels per side",
            width,
            height,
            MAX_DIMENSION
        );
    }

    match options.format {
        OutputFormat::Png => {
            let len = (width as usize)
                .checked_mul(height as usize)
                .and_then(|n| n.checked_mul(3))
                .ok_or_else(|| anyhow!("Image size {}x{} is too large", width, height))?;
            let mut buffer = vec![0u8; len];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                draw(&root, descriptor)?;
                root.present().map_err(backend_err("Failed to present drawing"))?;
            }
            encode_png(&buffer, width, height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw(&root, descriptor)?;
                root.present().map_err(backend_err("Failed to present drawing"))?;
            }
            Ok(svg.into_bytes())
        }
    }
}

/// File name for a rendered descriptor, e.g. `dept_bar.png`
pub fn output_file_name(descriptor: &ChartDescriptor, options: &RenderOptions) -> String {
    let stem: String = descriptor
        .column
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "column".to_string() } else { stem };
    let ext = match options.format {
        OutputFormat::Png => "png",
        OutputFormat::Svg => "svg",
    };
    format!("{}_{}.{}", stem, descriptor.kind, ext)
}

fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, d: &ChartDescriptor) -> Result<()> {
    root.fill(&WHITE).map_err(backend_err("Failed to fill background"))?;

    match (&d.payload, d.kind) {
        (Payload::Frequencies { table }, ChartKind::Pie) => {
            let labels = table.labels();
            draw_pie(root, &d.title, &labels, &table.shares())
        }
        (Payload::Frequencies { table }, _) => {
            let counts: Vec<f64> = table.counts().into_iter().map(|c| c as f64).collect();
            draw_bars(root, d, &table.labels(), &counts)
        }
        (Payload::Values { values }, _) => draw_line(root, d, values, None),
        (Payload::Codes { codes, encoding }, _) => {
            let values: Vec<f64> = codes.iter().map(|&c| c as f64).collect();
            let labels = code_tick_labels(codes, encoding);
            draw_line(root, d, &values, Some(labels.as_slice()))
        }
    }
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    d: &ChartDescriptor,
    categories: &[String],
    counts: &[f64],
) -> Result<()> {
    let num_categories = categories.len();
    let y_max = counts.iter().cloned().fold(0.0, f64::max);
    if !y_max.is_finite() {
        anyhow::bail!("Cannot plot counts of '{}': non-finite maximum", d.column);
    }

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&d.title, ("sans-serif", 20))
        .x_label_area_size(70)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..(num_categories as f64), 0.0..(y_max * 1.1).max(1.0))
        .map_err(backend_err("Failed to build chart"))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_categories)
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .x_label_formatter(&|x| {
            let idx = *x as usize;
            categories.get(idx).cloned().unwrap_or_default()
        })
        .x_desc(d.x_label.as_str())
        .y_desc(d.y_label.as_str())
        .draw()
        .map_err(backend_err("Failed to draw mesh"))?;

    let bar_width = 0.8;
    chart
        .draw_series(counts.iter().enumerate().map(|(idx, &count)| {
            let x_center = idx as f64 + 0.5;
            Rectangle::new(
                [
                    (x_center - bar_width / 2.0, 0.0),
                    (x_center + bar_width / 2.0, count),
                ],
                BAR_COLOR.mix(0.8).filled(),
            )
        }))
        .map_err(backend_err("Failed to draw bars"))?;

    Ok(())
}

fn draw_line<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    d: &ChartDescriptor,
    values: &[f64],
    code_labels: Option<&[String]>,
) -> Result<()> {
    let x_range = padded_range(0.0, values.len().saturating_sub(1) as f64)?;
    let y_min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let y_range = padded_range(y_min, y_max)
        .with_context(|| format!("Cannot plot values of '{}'", d.column))?;
    let y_span = (y_range.end - y_range.start).ceil() as usize;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&d.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(backend_err("Failed to build chart"))?;

    // Encoded sequences show the category behind each integer tick
    let label_for_code = |y: &f64| -> String {
        let rounded = y.round();
        match code_labels {
            Some(labels) if (y - rounded).abs() < 1e-6 && rounded >= 0.0 => {
                labels.get(rounded as usize).cloned().unwrap_or_default()
            }
            Some(_) => String::new(),
            None => format!("{}", y),
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(d.x_label.as_str()).y_desc(d.y_label.as_str());
    if code_labels.is_some() {
        // One tick per code in the visible range
        mesh.y_labels(y_span.max(2)).y_label_formatter(&label_for_code);
    }
    mesh.draw().map_err(backend_err("Failed to draw mesh"))?;

    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();

    chart
        .draw_series(LineSeries::new(points, LINE_COLOR.stroke_width(2)))
        .map_err(backend_err("Failed to draw line series"))?;

    Ok(())
}

fn draw_pie<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    labels: &[String],
    shares: &[f64],
) -> Result<()> {
    let area = root
        .titled(title, ("sans-serif", 20))
        .map_err(backend_err("Failed to draw title"))?;

    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = (w.min(h) as f64) * 0.35;

    // Start at twelve o'clock, go clockwise (pixel y grows downward)
    let mut start = -PI / 2.0;
    for (idx, (label, share)) in labels.iter().zip(shares).enumerate() {
        let sweep = share * 2.0 * PI;
        let end = start + sweep;

        let steps = ((sweep / (2.0 * PI)) * 120.0).ceil().max(2.0) as usize;
        let mut wedge = Vec::with_capacity(steps + 2);
        wedge.push((center.0 as i32, center.1 as i32));
        for step in 0..=steps {
            let angle = start + sweep * step as f64 / steps as f64;
            wedge.push(polar(center, radius, angle));
        }

        let color = Palette99::pick(idx).mix(0.9);
        area.draw(&Polygon::new(wedge, color.filled()))
            .map_err(backend_err("Failed to draw wedge"))?;

        let mid = start + sweep / 2.0;
        area.draw(&Text::new(
            format!("{} ({:.1}%)", label, share * 100.0),
            polar(center, radius * 1.15, mid),
            ("sans-serif", 14).into_font(),
        ))
        .map_err(backend_err("Failed to draw wedge label"))?;

        start = end;
    }

    Ok(())
}

fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 + radius * angle.sin()).round() as i32,
    )
}

/// Tick label per code; codes this sequence never uses stay blank.
fn code_tick_labels(codes: &[usize], encoding: &EncodingMap) -> Vec<String> {
    let mut labels = vec![String::new(); encoding.len()];
    for &code in codes {
        if let (Some(slot), Some(value)) = (labels.get_mut(code), encoding.value(code)) {
            if slot.is_empty() {
                *slot = value.to_string();
            }
        }
    }
    labels
}

/// Axis range with 5% padding on both sides; plotters cannot lay out
/// an infinite axis, so non-finite bounds are an error.
fn padded_range(min: f64, max: f64) -> Result<Range<f64>> {
    let range = if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    };
    if !range.start.is_finite() || !range.end.is_finite() {
        anyhow::bail!("axis range {}..{} is not finite", min, max);
    }
    Ok(range)
}

fn backend_err<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> anyhow::Error {
    move |e| anyhow!("{}: {}", what, e)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(buffer, width, height, image::ColorType::Rgb8)
        .context("Failed to encode PNG")?;
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, Value};
    use crate::ir::ColumnType;
    use crate::resolve::resolve;

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn dept() -> Column {
        Column::new(
            "dept",
            ["Ops", "R&D", "Ops", "Sales"]
                .iter()
                .map(|s| Value::Text(s.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(5.0, 5.0).unwrap(), 4.0..6.0);
        assert_eq!(padded_range(0.0, 100.0).unwrap(), -5.0..105.0);
        assert!(padded_range(1.0, f64::INFINITY).is_err());
        assert!(padded_range(-f64::MAX, f64::MAX).is_err());
    }

    #[test]
    fn test_infinite_values_fail_to_render() {
        let options = RenderOptions {
            width: 200,
            height: 150,
            format: OutputFormat::Svg,
        };
        let column = Column::new("v", vec![Value::Float(1.0), Value::Float(f64::INFINITY), Value::Float(2.0)]);
        let d = resolve(&column, ColumnType::Numeric, ChartKind::Line).unwrap();
        let err = render_descriptor(&d, &options).unwrap_err();
        assert!(format!("{:#}", err).contains("not finite"));

        let wide = Column::new("w", vec![Value::Float(1e308), Value::Float(-1e308)]);
        let d = resolve(&wide, ColumnType::Numeric, ChartKind::Line).unwrap();
        assert!(render_descriptor(&d, &options).is_err());
    }

    #[test]
    fn test_oversized_image_is_error() {
        let d = resolve(&dept(), ColumnType::Categorical, ChartKind::Bar).unwrap();
        for (width, height) in [(40_000, 40_000), (MAX_DIMENSION + 1, 10), (0, 100)] {
            let options = RenderOptions {
                width,
                height,
                format: OutputFormat::Png,
            };
            assert!(render_descriptor(&d, &options).is_err(), "{}x{} was accepted", width, height);
        }
    }

    #[test]
    fn test_code_labels_only_for_used_codes() {
        let mut session = EncodingMap::new();
        let first = Column::new("dept", vec![Value::Text("Ops".into()), Value::Text("R&D".into())]);
        crate::encode::encode_with(&mut session, &first).unwrap();
        let second = Column::new("dept", vec![Value::Text("Sales".into()), Value::Text("Ops".into())]);
        let d = crate::resolve::resolve_with(&second, ColumnType::Categorical, ChartKind::Line, &mut session).unwrap();

        match &d.payload {
            Payload::Codes { codes, encoding } => {
                assert_eq!(codes, &vec![2, 0]);
                assert_eq!(code_tick_labels(codes, encoding), vec!["Ops", "", "Sales"]);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_output_file_name() {
        let d = resolve(&Column::new("Hire Date/Year", vec![Value::Integer(1)]), ColumnType::Numeric, ChartKind::Pie).unwrap();
        let options = RenderOptions {
            format: OutputFormat::Svg,
            ..RenderOptions::default()
        };
        assert_eq!(output_file_name(&d, &options), "Hire_Date_Year_pie.svg");
    }

    #[test]
    fn test_renders_every_kind_as_png() {
        let options = RenderOptions {
            width: 320,
            height: 240,
            format: OutputFormat::Png,
        };
        for kind in ChartKind::ALL {
            let d = resolve(&dept(), ColumnType::Categorical, kind).unwrap();
            let bytes = render_descriptor(&d, &options).unwrap();
            assert!(is_valid_png(&bytes), "{:?} did not produce a PNG", kind);
        }
    }

    #[test]
    fn test_renders_svg() {
        let options = RenderOptions {
            width: 320,
            height: 240,
            format: OutputFormat::Svg,
        };
        let column = Column::new("n", vec![Value::Float(1.5), Value::Float(-2.0), Value::Float(3.25)]);
        let d = resolve(&column, ColumnType::Numeric, ChartKind::Line).unwrap();
        let bytes = render_descriptor(&d, &options).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<svg"));
    }
}
