//! Cooley-Tukey 基 2 FFT 蝶形调度

use super::{RemapStep, ShapeParams, loopend_bits, power_sizes};

/// FFT 蝶形索引
///
/// 外层循环 size = 2, 4, ... ≤ n，中层 i 以 size 为步长，
/// 内层 j ∈ [i, i + size/2)，k 以 n/size 为步长递增（旋转因子索引）。
/// `skip` 选择输出：00 → j，01 → j + size/2，10 → k。
///
/// 返回值不含 offset：offset 表示跳过调度开头的项数，由游标起点实现。
pub fn fft_butterfly(p: &ShapeParams) -> Vec<RemapStep> {
    let n = p.lims[0];
    let mut sizes = power_sizes(n);
    if p.inv[0] {
        sizes.reverse();
    }
    let mut out = Vec::new();

    for (si, &size) in sizes.iter().enumerate() {
        let size_end = si + 1 == sizes.len();
        let halfsize = size / 2;
        let tablestep = n / size;
        let mut ys: Vec<u32> = (0..n).step_by(size as usize).collect();
        if p.inv[1] {
            ys.reverse();
        }
        for (yi, &i) in ys.iter().enumerate() {
            let i_end = yi + 1 == ys.len();
            let mut jk: Vec<(u32, u32)> = (0..halfsize).map(|h| (i + h, h * tablestep)).collect();
            if p.inv[2] {
                jk.reverse();
            }
            for (ji, &(j, k)) in jk.iter().enumerate() {
                let j_end = ji + 1 == jk.len();
                let index = match p.skip {
                    0b01 => j + halfsize,
                    0b10 => k,
                    _ => j,
                };
                out.push(RemapStep::new(index, loopend_bits(j_end, i_end, size_end)));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(n: u32, skip: u8) -> Vec<u32> {
        let p = ShapeParams {
            lims: [n, 1, 1],
            skip,
            mode: 0b01,
            ..Default::default()
        };
        fft_butterfly(&p).iter().map(|s| s.index).collect()
    }

    #[test]
    fn test_fft8_low_half() {
        assert_eq!(
            run(8, 0b00),
            vec![0, 2, 4, 6, 0, 1, 4, 5, 0, 1, 2, 3]
        );
    }

    #[test]
    fn test_fft8_high_half_and_twiddle() {
        assert_eq!(
            run(8, 0b01),
            vec![1, 3, 5, 7, 2, 3, 6, 7, 4, 5, 6, 7]
        );
        assert_eq!(
            run(8, 0b10),
            vec![0, 0, 0, 0, 0, 2, 0, 2, 0, 1, 2, 3]
        );
    }

    #[test]
    fn test_fft_degenerate() {
        assert!(run(1, 0).is_empty());
    }

    #[test]
    fn test_fft_last_is_full_end() {
        let p = ShapeParams {
            lims: [4, 1, 1],
            ..Default::default()
        };
        let s = fft_butterfly(&p);
        assert_eq!(s.len(), 4);
        assert_eq!(s[3].loopends, 0b111);
        // size=2 阶段的最后一项：j、i 都结束，size 未结束
        assert_eq!(s[1].loopends, 0b011);
    }
}
