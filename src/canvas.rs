use crate::surface::{Rgba, Surface};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// 2x3 affine matrix, canvas order: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Affine {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Affine {
    const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += self.a * tx + self.c * ty;
        self.f += self.b * tx + self.d * ty;
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.a *= sx;
        self.b *= sx;
        self.c *= sy;
        self.d *= sy;
    }

    fn rotate(&mut self, radians: f32) {
        let (s, c) = radians.sin_cos();
        let (a, b) = (self.a, self.b);
        self.a = a * c + self.c * s;
        self.b = b * c + self.d * s;
        self.c = -a * s + self.c * c;
        self.d = -b * s + self.d * c;
    }
}

#[derive(Clone, Copy)]
struct DrawState {
    transform: Affine,
    fill: Rgba,
    global_alpha: f32,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: Rgba::opaque(0, 0, 0),
            global_alpha: 1.0,
        }
    }
}

/// RGBA raster implementing [`Surface`].
///
/// Paths are flattened to polylines in device space and filled with the
/// non-zero winding rule, sampling pixel centres. No antialiasing: the braille
/// output only has one bit per pixel anyway.
pub struct PixelCanvas {
    w: u32,
    h: u32,
    px: Vec<Pixel>,
    state: DrawState,
    stack: Vec<DrawState>,
    subpaths: Vec<Vec<(f32, f32)>>,
}

impl PixelCanvas {
    pub fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
            state: DrawState::default(),
            stack: Vec::new(),
            subpaths: Vec::new(),
        }
    }

    /// Reallocates the raster. Like a canvas element, this wipes pixels and
    /// drawing state.
    pub fn resize(&mut self, w: u32, h: u32) {
        *self = Self::new(w, h);
    }

    pub fn pixel_width(&self) -> u32 {
        self.w
    }

    pub fn pixel_height(&self) -> u32 {
        self.h
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        if x >= self.w || y >= self.h {
            return Pixel::default();
        }
        self.px[self.idx(x, y)]
    }

    pub fn painted_pixels(&self) -> usize {
        self.px.iter().filter(|p| p.a > 0).count()
    }

    fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    fn blend_over(&mut self, x: u32, y: u32, src: Pixel) {
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }

    /// Source-over composites `top` onto this canvas. Both must share a size;
    /// the overlapping region is used otherwise.
    pub fn composite_over(&mut self, top: &PixelCanvas) {
        let w = self.w.min(top.w);
        let h = self.h.min(top.h);
        for y in 0..h {
            for x in 0..w {
                let src = top.px[top.idx(x, y)];
                if src.a > 0 {
                    self.blend_over(x, y, src);
                }
            }
        }
    }

    pub fn copy_from(&mut self, other: &PixelCanvas) {
        if self.w != other.w || self.h != other.h {
            self.resize(other.w, other.h);
        }
        self.px.copy_from_slice(&other.px);
    }

    fn current_point(&self) -> Option<(f32, f32)> {
        self.subpaths.last().and_then(|sp| sp.last().copied())
    }

    fn push_point(&mut self, p: (f32, f32)) {
        match self.subpaths.last_mut() {
            Some(sp) => sp.push(p),
            None => self.subpaths.push(vec![p]),
        }
    }

    fn fill_polygons(&mut self, color: Pixel) {
        let mut edges: Vec<(f32, f32, f32, f32)> = Vec::new();
        let mut y_min = f32::INFINITY;
        let mut y_max = f32::NEG_INFINITY;
        for sp in &self.subpaths {
            if sp.len() < 3 {
                continue;
            }
            for (i, &(x0, y0)) in sp.iter().enumerate() {
                let (x1, y1) = sp[(i + 1) % sp.len()];
                if y0 == y1 {
                    continue;
                }
                y_min = y_min.min(y0.min(y1));
                y_max = y_max.max(y0.max(y1));
                edges.push((x0, y0, x1, y1));
            }
        }
        if edges.is_empty() || !y_min.is_finite() || !y_max.is_finite() {
            return;
        }

        let row0 = y_min.floor().max(0.0) as u32;
        let row1 = (y_max.ceil().min(self.h as f32)).max(0.0) as u32;
        let mut hits: Vec<(f32, i32)> = Vec::new();

        for row in row0..row1 {
            let sy = row as f32 + 0.5;
            hits.clear();
            for &(x0, y0, x1, y1) in &edges {
                let (lo, hi) = if y0 < y1 { (y0, y1) } else { (y1, y0) };
                if sy < lo || sy >= hi {
                    continue;
                }
                let t = (sy - y0) / (y1 - y0);
                let winding = if y1 > y0 { 1 } else { -1 };
                hits.push((x0 + (x1 - x0) * t, winding));
            }
            hits.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in hits.windows(2) {
                winding += pair[0].1;
                if winding == 0 {
                    continue;
                }
                // pixel centres in [xa, xb)
                let xa = (pair[0].0 - 0.5).ceil().max(0.0);
                let xb = (pair[1].0 - 0.5).ceil().min(self.w as f32);
                if xb <= xa {
                    continue;
                }
                for col in xa as u32..xb as u32 {
                    self.blend_over(col, row, color);
                }
            }
        }
    }
}

fn flatten_steps(p0: (f32, f32), c1: (f32, f32), c2: (f32, f32), p3: (f32, f32)) -> usize {
    let dist = |a: (f32, f32), b: (f32, f32)| ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
    let hull = dist(p0, c1) + dist(c1, c2) + dist(c2, p3);
    ((hull / 2.0).ceil() as usize).clamp(4, 48)
}

impl Surface for PixelCanvas {
    fn width(&self) -> f32 {
        self.w as f32
    }

    fn height(&self) -> f32 {
        self.h as f32
    }

    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let x0 = x.max(0.0).floor() as u32;
        let y0 = y.max(0.0).floor() as u32;
        let x1 = ((x + w).ceil().max(0.0) as u32).min(self.w);
        let y1 = ((y + h).ceil().max(0.0) as u32).min(self.h);
        for row in y0..y1 {
            let start = self.idx(x0.min(x1), row);
            let end = self.idx(x1, row);
            self.px[start..end].fill(Pixel::default());
        }
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(s) = self.stack.pop() {
            self.state = s;
        }
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.state.transform.translate(x, y);
    }

    fn rotate(&mut self, radians: f32) {
        self.state.transform.rotate(radians);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.state.transform.scale(sx, sy);
    }

    fn begin_path(&mut self) {
        self.subpaths.clear();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.state.transform.apply(x, y);
        self.subpaths.push(vec![p]);
    }

    fn bezier_curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let t = self.state.transform;
        let c1 = t.apply(c1x, c1y);
        let c2 = t.apply(c2x, c2y);
        let p3 = t.apply(x, y);
        let p0 = match self.current_point() {
            Some(p) => p,
            None => {
                // a curve with no current point starts at its first control point
                self.subpaths.push(vec![c1]);
                c1
            }
        };

        let steps = flatten_steps(p0, c1, c2, p3);
        for i in 1..=steps {
            let s = i as f32 / steps as f32;
            let u = 1.0 - s;
            let (w0, w1, w2, w3) = (u * u * u, 3.0 * u * u * s, 3.0 * u * s * s, s * s * s);
            self.push_point((
                w0 * p0.0 + w1 * c1.0 + w2 * c2.0 + w3 * p3.0,
                w0 * p0.1 + w1 * c1.1 + w2 * c2.1 + w3 * p3.1,
            ));
        }
    }

    fn close_path(&mut self) {
        if let Some(start) = self.subpaths.last().and_then(|sp| sp.first().copied()) {
            self.push_point(start);
            self.subpaths.push(vec![start]);
        }
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.state.fill = color;
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        // canvas ignores out-of-range values
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    fn fill(&mut self) {
        let fill = self.state.fill;
        let a = (fill.a * self.state.global_alpha).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let color = Pixel {
            r: fill.r,
            g: fill.g,
            b: fill.b,
            a: (a * 255.0 + 0.5) as u8,
        };
        if color.a == 0 {
            return;
        }
        self.fill_polygons(color);
    }
}
