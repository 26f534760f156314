use serde::{Deserialize, Serialize};

/// Channel ordering a controller expects on the wire.
///
/// The six permutations of R, G and B; WS2812-style strips are
/// commonly GRB, most network protocols take RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorOrder {
    #[default]
    Rgb,
    Rbg,
    Grb,
    Brg,
    Gbr,
    Bgr,
}

impl ColorOrder {
    pub const ALL: [ColorOrder; 6] = [
        ColorOrder::Rgb,
        ColorOrder::Rbg,
        ColorOrder::Grb,
        ColorOrder::Brg,
        ColorOrder::Gbr,
        ColorOrder::Bgr,
    ];

    /// Source channel index for each output position.
    fn permutation(self) -> [usize; 3] {
        match self {
            ColorOrder::Rgb => [0, 1, 2],
            ColorOrder::Rbg => [0, 2, 1],
            ColorOrder::Grb => [1, 0, 2],
            ColorOrder::Brg => [2, 0, 1],
            ColorOrder::Gbr => [1, 2, 0],
            ColorOrder::Bgr => [2, 1, 0],
        }
    }

    /// Reorder RGB triples into this wire order. Pure and deterministic;
    /// the input length must be a multiple of 3.
    pub fn apply(self, rgb: &[u8]) -> Vec<u8> {
        let [a, b, c] = self.permutation();
        let mut out = Vec::with_capacity(rgb.len());
        for pixel in rgb.chunks(3) {
            out.push(pixel[a]);
            out.push(pixel[b]);
            out.push(pixel[c]);
        }
        out
    }

    /// Invert wire-ordered bytes back to RGB. `order.invert(&order.apply(x)) == x`.
    pub fn invert(self, wire: &[u8]) -> Vec<u8> {
        let perm = self.permutation();
        let mut out = vec![0; wire.len()];
        for (i, pixel) in wire.chunks(3).enumerate() {
            for (pos, &src) in perm.iter().enumerate() {
                out[i * 3 + src] = pixel[pos];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grb_swaps_first_two_channels() {
        assert_eq!(ColorOrder::Grb.apply(&[10, 20, 30]), vec![20, 10, 30]);
        assert_eq!(ColorOrder::Bgr.apply(&[10, 20, 30]), vec![30, 20, 10]);
    }

    #[test]
    fn apply_then_invert_round_trips_all_orders() {
        let rgb: Vec<u8> = (0..30).collect();
        for order in ColorOrder::ALL {
            let wire = order.apply(&rgb);
            assert_eq!(order.invert(&wire), rgb, "{:?}", order);
        }
    }

    #[test]
    fn rgb_is_identity() {
        let rgb = [1u8, 2, 3, 4, 5, 6];
        assert_eq!(ColorOrder::Rgb.apply(&rgb), rgb.to_vec());
    }
}
