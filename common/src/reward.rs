use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Curve mapping accumulated vote shares to reward claims.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RewardCurve {
    Quadratic,
    Linear,
    SquareRoot,
    #[default]
    ConvergentLinear,
    ConvergentSquareRoot,
}

impl RewardCurve {
    fn id(&self) -> u8 {
        match self {
            RewardCurve::Quadratic => 0,
            RewardCurve::Linear => 1,
            RewardCurve::SquareRoot => 2,
            RewardCurve::ConvergentLinear => 3,
            RewardCurve::ConvergentSquareRoot => 4,
        }
    }

    /// Claim weight of `rshares` on this curve.
    ///
    /// `content_constant` moves the point where convergent curves become
    /// linear. Results that would not fit are saturated.
    pub fn evaluate(&self, rshares: u128, content_constant: u128) -> u128 {
        let r = U256::from(rshares);
        let s = U256::from(content_constant);

        let claim = match self {
            RewardCurve::Quadratic => {
                let rs = r + s;
                rs * rs - s * s
            }
            RewardCurve::Linear => r,
            RewardCurve::SquareRoot => U256::from(approx_sqrt(rshares)),
            RewardCurve::ConvergentLinear => {
                let rs = r + s;
                (rs * rs - s * s) / (r + s * 4)
            }
            RewardCurve::ConvergentSquareRoot => {
                let root = approx_sqrt(rshares.saturating_add(content_constant.saturating_mul(2)));
                if root == 0 {
                    U256::zero()
                } else {
                    r / U256::from(root)
                }
            }
        };

        if claim > U256::from(u128::MAX) {
            u128::MAX
        } else {
            claim.as_u128()
        }
    }
}

impl Serializer for RewardCurve {
    fn write(&self, writer: &mut Writer) {
        writer.write_u8(self.id());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(match reader.read_u8()? {
            0 => RewardCurve::Quadratic,
            1 => RewardCurve::Linear,
            2 => RewardCurve::SquareRoot,
            3 => RewardCurve::ConvergentLinear,
            4 => RewardCurve::ConvergentSquareRoot,
            _ => return Err(ReaderError::InvalidValue),
        })
    }

    fn size(&self) -> usize {
        1
    }
}

/// Integer square root approximation built from the most significant bit.
///
/// The exponent is halved exactly and the mantissa linearly, which keeps the
/// result monotonic and within a few percent of the real root.
pub fn approx_sqrt(x: u128) -> u128 {
    if x == 0 {
        return 0;
    }

    let msb_x = 127 - x.leading_zeros();
    let msb_z = msb_x >> 1;

    let msb_x_bit: u128 = 1 << msb_x;
    let msb_z_bit: u128 = 1 << msb_z;

    let mantissa_mask = msb_x_bit - 1;
    let mantissa_x = x & mantissa_mask;

    let mantissa_z_hi = if msb_x & 1 == 1 { msb_z_bit } else { 0 };
    let mantissa_z_lo = mantissa_x >> (msb_x - msb_z);
    let mantissa_z = (mantissa_z_hi | mantissa_z_lo) >> 1;

    msb_z_bit | mantissa_z
}

/// `floor(fund * claim / total_claims)` without intermediate overflow.
pub fn reward_share(fund: i64, claim: u128, total_claims: u128) -> i64 {
    if fund <= 0 || claim == 0 || total_claims == 0 {
        return 0;
    }

    let share = U256::from(fund as u64) * U256::from(claim) / U256::from(total_claims);
    // claim <= total keeps the share within the fund
    share.min(U256::from(fund as u64)).as_u64() as i64
}
