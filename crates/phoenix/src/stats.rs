use phoenix_core::{Argb, DrawSink, FrameReport, Point};
use std::collections::BTreeMap;
use std::fmt;

/// Draw sink that only counts what it is asked to draw
#[derive(Debug, Default)]
pub struct StatsSink {
    pub commands: BTreeMap<&'static str, u64>,
    pub frames: u64,
    pub rendered: u64,
    pub failed: u64,
    pub fallbacks: u64,
    pub structural_errors: u64,
}

impl StatsSink {
    fn count(&mut self, kind: &'static str) {
        *self.commands.entry(kind).or_default() += 1;
    }

    pub fn record_report(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.rendered += report.rendered as u64;
        self.failed += report.failed as u64;
        self.fallbacks += report.fallbacks as u64;
    }

    pub fn record_error(&mut self) {
        self.frames += 1;
        self.structural_errors += 1;
        self.fallbacks += 1;
    }

    pub fn total_commands(&self) -> u64 {
        self.commands.values().sum()
    }
}

impl DrawSink for StatsSink {
    fn clear(&mut self, _color: Argb) {
        self.count("clear");
    }

    fn line(&mut self, _from: Point, _to: Point, _color: Argb, _thickness: f32) {
        self.count("line");
    }

    fn rect(&mut self, _origin: Point, _width: f32, _height: f32, _color: Argb, _filled: bool) {
        self.count("rect");
    }

    fn circle(&mut self, _center: Point, _radius: f32, _color: Argb, _filled: bool) {
        self.count("circle");
    }

    fn text(&mut self, _position: Point, _text: &str, _color: Argb, _size: f32) {
        self.count("text");
    }

    fn polygon(&mut self, _points: &[Point], _color: Argb) {
        self.count("polygon");
    }
}

impl fmt::Display for StatsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames:            {}", self.frames)?;
        writeln!(f, "nodes rendered:    {}", self.rendered)?;
        writeln!(f, "node failures:     {}", self.failed)?;
        writeln!(f, "fallbacks drawn:   {}", self.fallbacks)?;
        writeln!(f, "structural errors: {}", self.structural_errors)?;
        writeln!(f, "draw commands:     {}", self.total_commands())?;
        for (kind, count) in &self.commands {
            writeln!(f, "  {:<8} {}", kind, count)?;
        }
        Ok(())
    }
}
