//! SVG export of a finished layout.
//!
//! Slabs are stacked vertically with a margin between them. Slab coordinates
//! have their origin in the lower-left corner, so y is flipped per slab.

use svg::Document;
use svg::node::element::{Group, Rectangle, Text, Title};

use crate::layout::Layout;
use crate::model::PlacedPart;
use crate::slab::Slab;

/// Drawing options for [`layout_to_svg`].
#[derive(Clone, Copy, Debug)]
pub struct SvgDrawOptions {
    /// Vertical space between two slabs, in slab units.
    pub slab_margin: f64,
    /// Writes label and cut size into every part.
    pub labels: bool,
    /// Draws the padded footprint behind the cut outline.
    pub kerf_outline: bool,
    pub slab_fill: &'static str,
    pub part_fill: &'static str,
}

impl Default for SvgDrawOptions {
    fn default() -> Self {
        Self {
            slab_margin: 8.0,
            labels: true,
            kerf_outline: true,
            slab_fill: "#d9d4cc",
            part_fill: "#7fa7c9",
        }
    }
}

pub fn layout_to_svg(layout: &Layout, options: SvgDrawOptions) -> Document {
    let slab_count = layout.slab_count() as f64;
    let total_height = if layout.slab_count() == 0 {
        layout.slab_height
    } else {
        slab_count * layout.slab_height + (slab_count - 1.0) * options.slab_margin
    };
    let stroke_width = f64::min(layout.slab_width, layout.slab_height) * 0.003;

    let mut document = Document::new()
        .set("viewBox", (0.0, 0.0, layout.slab_width, total_height))
        .set("width", format!("{}", layout.slab_width))
        .set("height", format!("{}", total_height));

    for slab in &layout.slabs {
        let offset = slab.index as f64 * (layout.slab_height + options.slab_margin);
        document = document.add(slab_group(slab, offset, stroke_width, &options));
    }
    document
}

/// Serialized SVG markup of [`layout_to_svg`].
pub fn layout_to_svg_string(layout: &Layout, options: SvgDrawOptions) -> String {
    layout_to_svg(layout, options).to_string()
}

fn slab_group(slab: &Slab, offset: f64, stroke_width: f64, options: &SvgDrawOptions) -> Group {
    let title = Title::new(format!(
        "slab {}: {} parts, {:.1}% used",
        slab.index,
        slab.placed().len(),
        slab.utilization_percent()
    ));
    let outline = Rectangle::new()
        .set("x", 0.0)
        .set("y", offset)
        .set("width", slab.width)
        .set("height", slab.height)
        .set("fill", options.slab_fill)
        .set("stroke", "black")
        .set("stroke-width", 2.0 * stroke_width);

    let mut group = Group::new()
        .set("id", format!("slab_{}", slab.index))
        .add(title)
        .add(outline);

    for part in slab.placed() {
        group = group.add(part_group(part, slab.height, offset, stroke_width, options));
    }
    group
}

fn part_group(
    part: &PlacedPart,
    slab_height: f64,
    offset: f64,
    stroke_width: f64,
    options: &SvgDrawOptions,
) -> Group {
    // top edges in svg coordinates
    let top = offset + slab_height - part.footprint().max.y;
    let cut = part.cut_rect();
    let cut_top = offset + slab_height - cut.max.y;

    let mut group = Group::new()
        .set("id", format!("unit_{}", part.unit_id))
        .add(Title::new(format!(
            "{} (unit {}): {} x {} at ({}, {}){}",
            part.label,
            part.unit_id,
            part.cut_width,
            part.cut_height,
            part.x,
            part.y,
            if part.orientation.is_rotated() { ", rotated" } else { "" }
        )));

    if options.kerf_outline {
        group = group.add(
            Rectangle::new()
                .set("x", part.x)
                .set("y", top)
                .set("width", part.placed_width)
                .set("height", part.placed_height)
                .set("fill", "white")
                .set("fill-opacity", "0.4")
                .set("stroke", "gray")
                .set("stroke-width", stroke_width)
                .set("stroke-dasharray", format!("{}", 4.0 * stroke_width)),
        );
    }

    group = group.add(
        Rectangle::new()
            .set("x", part.x)
            .set("y", cut_top)
            .set("width", part.cut_width)
            .set("height", part.cut_height)
            .set("fill", options.part_fill)
            .set("stroke", "black")
            .set("stroke-width", stroke_width),
    );

    if options.labels {
        let font_size = f64::min(part.cut_width, part.cut_height) * 0.2;
        let center_x = cut.center().x;
        let center_y = cut_top + part.cut_height / 2.0;
        group = group.add(
            Text::new(format!(
                "{} {}x{}",
                part.label, part.cut_width, part.cut_height
            ))
            .set("x", center_x)
            .set("y", center_y)
            .set("font-size", font_size)
            .set("text-anchor", "middle")
            .set("dominant-baseline", "middle"),
        );
    }
    group
}
