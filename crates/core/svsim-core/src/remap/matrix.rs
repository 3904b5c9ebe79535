//! 矩阵遍历调度（mode 0b00）

use super::{RemapStep, ShapeParams, loopend_bits};

/// `skip` 选中的维度（按 order 排列后的位置）
fn select_mask(skip: u8) -> u8 {
    match skip {
        0b11 => 0b011,
        0b01 => 0b110,
        0b10 => 0b101,
        _ => 0b111,
    }
}

fn axis(lim: u32, inv: bool) -> Vec<u32> {
    let mut r: Vec<u32> = (0..lim).collect();
    if inv {
        r.reverse();
    }
    r
}

/// 三重循环 z(外)/y/x(内)，按 `order` 重新排列维度后线性化
pub fn matrix_indices(p: &ShapeParams) -> Vec<RemapStep> {
    let [xd, yd, zd] = p.lims;
    let (xr, yr, zr) = (axis(xd, p.inv[0]), axis(yd, p.inv[1]), axis(zd, p.inv[2]));
    let select = select_mask(p.skip);
    let mut out = Vec::with_capacity((xd * yd * zd) as usize);

    for (zi, &z) in zr.iter().enumerate() {
        let z_end = zi + 1 == zr.len();
        for (yi, &y) in yr.iter().enumerate() {
            let y_end = yi + 1 == yr.len();
            for (xi, &x) in xr.iter().enumerate() {
                let x_end = xi + 1 == xr.len();
                let vals = [(xd, x), (yd, y), (zd, z)];
                let mut result = 0u32;
                let mut mult = 1u32;
                for (i, &o) in p.order.iter().enumerate() {
                    let (lim, idx) = vals[o];
                    if select & (1 << i) != 0 {
                        result += idx * mult;
                        mult *= lim;
                    }
                }
                out.push(RemapStep::new(
                    result + p.offset,
                    loopend_bits(x_end, y_end, z_end),
                ));
            }
        }
    }
    out
}
