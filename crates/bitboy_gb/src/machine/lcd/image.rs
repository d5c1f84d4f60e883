use super::LcdImageLine;

/// Immutable frame made of equally long lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LcdImage {
    lines: Vec<LcdImageLine>,
}

impl LcdImage {
    /// # Panics
    /// If there are no lines or they differ in length.
    pub fn new(lines: Vec<LcdImageLine>) -> Self {
        assert!(!lines.is_empty(), "image needs at least one line");
        let width = lines[0].size();
        assert!(
            lines.iter().all(|l| l.size() == width),
            "image lines differ in length"
        );
        Self { lines }
    }

    /// Image of color 0 everywhere.
    pub fn blank(width: usize, height: usize) -> Self {
        Self::new(vec![LcdImageLine::blank(width); height])
    }

    pub fn width(&self) -> usize {
        self.lines[0].size()
    }

    pub fn height(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, y: usize) -> &LcdImageLine {
        &self.lines[y]
    }

    /// Color index (0..=3) of the pixel at (`x`, `y`).
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.lines[y].color(x)
    }

    /// Each line as its msb plane bytes followed by its lsb plane bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width() / 4 * self.height());
        for line in &self.lines {
            out.extend(line.msb().to_bytes());
            out.extend(line.lsb().to_bytes());
        }
        out
    }
}

/// Collects the lines of a frame while it is being drawn.
#[derive(Clone, Debug)]
pub struct LcdImageBuilder {
    lines: Vec<LcdImageLine>,
}

impl LcdImageBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            lines: vec![LcdImageLine::blank(width); height],
        }
    }

    /// # Panics
    /// If `y` is outside the image or the line has the wrong length.
    pub fn set_line(&mut self, y: usize, line: LcdImageLine) -> &mut Self {
        assert_eq!(line.size(), self.lines[y].size(), "line length mismatch");
        self.lines[y] = line;
        self
    }

    pub fn build(self) -> LcdImage {
        LcdImage::new(self.lines)
    }
}
