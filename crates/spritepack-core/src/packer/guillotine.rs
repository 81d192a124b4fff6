use super::{Packer, Placement};
use crate::config::{GuillotineChoice, GuillotineSplit};
use crate::model::Rect;

/// Guillotine free-rect packer over a `width x height` canvas at the origin.
pub struct GuillotinePacker {
    free: Vec<Rect>,
    used: Vec<Rect>,
    allow_rotation: bool,
    choice: GuillotineChoice,
    split: GuillotineSplit,
}

impl GuillotinePacker {
    pub fn new(
        width: u32,
        height: u32,
        allow_rotation: bool,
        choice: GuillotineChoice,
        split: GuillotineSplit,
    ) -> Self {
        let free = if width > 0 && height > 0 {
            vec![Rect::new(0, 0, width, height)]
        } else {
            Vec::new()
        };
        Self {
            free,
            used: Vec::new(),
            allow_rotation,
            choice,
            split,
        }
    }

    /// Rectangles placed so far, in placement order.
    pub fn used(&self) -> &[Rect] {
        &self.used
    }

    fn score(choice: &GuillotineChoice, fr: &Rect, w: u32, h: u32) -> i64 {
        let area_fit = fr.area() as i64 - (w as u64 * h as u64) as i64;
        let leftover_h = fr.w as i64 - w as i64;
        let leftover_v = fr.h as i64 - h as i64;
        let short_fit = leftover_h.abs().min(leftover_v.abs());
        let long_fit = leftover_h.abs().max(leftover_v.abs());
        match choice {
            GuillotineChoice::BestAreaFit => area_fit,
            GuillotineChoice::BestShortSideFit => short_fit,
            GuillotineChoice::BestLongSideFit => long_fit,
            GuillotineChoice::WorstAreaFit => -area_fit,
            GuillotineChoice::WorstShortSideFit => -short_fit,
            GuillotineChoice::WorstLongSideFit => -long_fit,
        }
    }

    fn best_fit(&self, w: u32, h: u32) -> Option<(usize, Rect)> {
        let mut best: Option<(usize, Rect)> = None;
        let mut best_score = i64::MAX;
        for (i, fr) in self.free.iter().enumerate() {
            if fr.w >= w && fr.h >= h {
                let s = Self::score(&self.choice, fr, w, h);
                if s < best_score {
                    best_score = s;
                    best = Some((i, Rect::new(fr.x, fr.y, w, h)));
                }
            }
        }
        best
    }

    /// Unrotated fits always win; the rotated footprint is only tried when nothing
    /// accepts the unrotated one.
    fn choose(&self, w: u32, h: u32) -> Option<(usize, Rect, bool)> {
        if let Some((idx, rect)) = self.best_fit(w, h) {
            return Some((idx, rect, false));
        }
        if self.allow_rotation && w != h {
            return self.best_fit(h, w).map(|(idx, rect)| (idx, rect, true));
        }
        None
    }

    fn split(&self, fr: &Rect, placed: &Rect) -> (Option<Rect>, Option<Rect>) {
        // leftover widths/heights (right/bottom), as in Jylänki's SplitFreeRectAlongAxis
        let w_right = (fr.x + fr.w).saturating_sub(placed.x + placed.w);
        let h_bottom = (fr.y + fr.h).saturating_sub(placed.y + placed.h);

        let split_horizontal = match self.split {
            GuillotineSplit::SplitShorterLeftoverAxis => h_bottom < w_right,
            GuillotineSplit::SplitLongerLeftoverAxis => h_bottom > w_right,
            GuillotineSplit::SplitMinimizeArea => {
                (w_right as u64 * fr.h as u64) <= (fr.w as u64 * h_bottom as u64)
            }
            GuillotineSplit::SplitMaximizeArea => {
                (w_right as u64 * fr.h as u64) >= (fr.w as u64 * h_bottom as u64)
            }
            GuillotineSplit::SplitShorterAxis => fr.h < fr.w,
            GuillotineSplit::SplitLongerAxis => fr.h > fr.w,
        };

        let mut bottom = Rect::new(fr.x, placed.y + placed.h, 0, fr.h.saturating_sub(placed.h));
        let mut right = Rect::new(placed.x + placed.w, fr.y, fr.w.saturating_sub(placed.w), 0);
        if split_horizontal {
            bottom.w = fr.w;
            right.h = placed.h;
        } else {
            bottom.w = placed.w;
            right.h = fr.h;
        }
        let keep = |r: Rect| (r.w > 0 && r.h > 0).then_some(r);
        (keep(bottom), keep(right))
    }

    fn place(&mut self, idx: usize, placed: &Rect) {
        let fr = self.free.swap_remove(idx);
        let (a, b) = self.split(&fr, placed);
        self.free.extend(a);
        self.free.extend(b);
        self.prune_free_list();
        self.merge_free_list();
        self.used.push(*placed);
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let a = self.free[i];
            let mut remove_i = false;
            let mut j = i + 1;
            while j < self.free.len() {
                let b = self.free[j];
                if covers(&b, &a) {
                    remove_i = true;
                    break;
                }
                if covers(&a, &b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn merge_free_list(&mut self) {
        while let Some((i, j, joined)) = self.find_merge() {
            self.free[i] = joined;
            self.free.remove(j);
        }
    }

    fn find_merge(&self) -> Option<(usize, usize, Rect)> {
        for i in 0..self.free.len() {
            for j in i + 1..self.free.len() {
                let (a, b) = (self.free[i], self.free[j]);
                // same row band, touching in x
                if a.y == b.y && a.h == b.h {
                    if a.x + a.w == b.x {
                        return Some((i, j, Rect::new(a.x, a.y, a.w + b.w, a.h)));
                    }
                    if b.x + b.w == a.x {
                        return Some((i, j, Rect::new(b.x, a.y, a.w + b.w, a.h)));
                    }
                }
                // same column band, touching in y
                if a.x == b.x && a.w == b.w {
                    if a.y + a.h == b.y {
                        return Some((i, j, Rect::new(a.x, a.y, a.w, a.h + b.h)));
                    }
                    if b.y + b.h == a.y {
                        return Some((i, j, Rect::new(a.x, b.y, a.w, a.h + b.h)));
                    }
                }
            }
        }
        None
    }
}

/// True if `outer` fully covers `inner` (exclusive far edges).
fn covers(outer: &Rect, inner: &Rect) -> bool {
    inner.x >= outer.x
        && inner.y >= outer.y
        && inner.x + inner.w <= outer.x + outer.w
        && inner.y + inner.h <= outer.y + outer.h
}

impl Packer for GuillotinePacker {
    fn can_pack(&self, w: u32, h: u32) -> bool {
        self.choose(w, h).is_some()
    }

    fn pack(&mut self, w: u32, h: u32) -> Option<Placement> {
        let (idx, rect, rotated) = self.choose(w, h)?;
        self.place(idx, &rect);
        Some(Placement { rect, rotated })
    }
}
