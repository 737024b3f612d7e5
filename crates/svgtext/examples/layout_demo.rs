//! Lay out a small styled tree with the system fonts and print the
//! per-character positions and caret stops.
//!
//! Run with: cargo run --example layout_demo

use svgtext::{
    layout, CharTransform, ContentNode, FontBook, LayoutOptions, TextAnchor, TextStyle,
};

fn main() {
    let mut book = FontBook::new();
    book.load_system_fonts();

    let mut style = TextStyle::default();
    style.font.families = vec!["sans-serif".to_string()];
    style.font_size = 16.0;
    style.anchor = TextAnchor::Middle;

    let mut accent = style.inherited();
    accent.baseline_shift = svgtext::BaselineShift::Super;

    let root = ContentNode::span(
        style.clone(),
        vec![
            ContentNode::leaf("Hello, ", style.clone()),
            ContentNode::leaf("world", accent),
            ContentNode::leaf("!", style.clone()).with_transforms(vec![CharTransform {
                rotate: Some(0.4),
                ..CharTransform::default()
            }]),
        ],
    );

    let out = layout(&root, &mut book, &LayoutOptions::default());

    println!("laid out {} characters on {} line(s)", out.result.len(), out.lines.len());
    for (i, cr) in out.result.iter().enumerate() {
        if !cr.addressable || cr.hidden {
            continue;
        }
        println!(
            "  #{i:2} pos=({:7.2}, {:7.2}) advance={:6.2} visual={:?}",
            cr.final_position.x,
            cr.final_position.y,
            cr.advance.x,
            cr.visual_index,
        );
    }
    println!("caret stops: {}", out.cursor_positions.len());
    for pos in &out.cursor_positions {
        println!(
            "  cluster={:2} index={:2} offset={} synthetic={}",
            pos.cluster, pos.index, pos.offset, pos.synthetic
        );
    }
}
