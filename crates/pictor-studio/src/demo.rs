use anyhow::Result;
use pictor_engine::document::Mutation;
use pictor_engine::geometry::{CornerRadii, Geometry, StrokeStyle, Transform};
use pictor_engine::{Color, GradientStop, NodeSpec, Paint, SharedDocument};

/// Fills `doc` with a small scene exercising every paint kind.
pub fn populate(doc: &SharedDocument) -> Result<()> {
    let sunset = vec![
        GradientStop::new(0.0, Color::rgb(255, 94, 58)),
        GradientStop::new(0.6, Color::rgb(255, 149, 0)),
        GradientStop::new(1.0, Color::rgb(255, 219, 76)),
    ];
    let glow = vec![
        GradientStop::new(0.0, Color::WHITE),
        GradientStop::new(1.0, Color::rgba(90, 200, 250, 0.0)),
    ];

    let batch = vec![
        Mutation::CreateNode(
            NodeSpec::new(Geometry::Rect {
                width: 600.0,
                height: 400.0,
                corner_radius: CornerRadii::all(24.0),
            })
            .with_name("backdrop")
            .with_fill(Paint::linear(sunset).with_opacity(0.9)),
        ),
        Mutation::CreateNode(
            NodeSpec::new(Geometry::ellipse(220.0, 220.0))
                .with_name("glow")
                .with_transform(Transform::translate(60.0, 90.0))
                .with_fill(Paint::radial(glow)),
        ),
        Mutation::CreateNode(
            NodeSpec::new(Geometry::Star {
                width: 160.0,
                height: 160.0,
                point_count: 5,
                inner_radius: 0.45,
            })
            .with_name("star")
            .with_transform(Transform::from_position_rotation(380.0, 80.0, 12.0))
            .with_fill(Paint::solid(Color::rgb(88, 86, 214)))
            .with_stroke(Paint::solid(Color::WHITE), StrokeStyle::with_width(4.0)),
        ),
    ];
    let report = doc.submit_batch(&batch)?;
    log::info!("demo scene ready at r{}", report.revision);
    Ok(())
}
