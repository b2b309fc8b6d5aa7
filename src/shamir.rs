use std::collections::BTreeSet;

use tracing::instrument;

use crate::error::{Error, Result};
use crate::group::{sum_elements, PrimeGroup};
use crate::types::Shadow;

/// Evaluation point of participant `index`. Participants are numbered from
/// zero, so shares live at `x = index + 1` and `x = 0` holds the secret.
pub fn share_x<G: PrimeGroup>(index: u32) -> G::Scalar {
    G::scalar_from_u64(u64::from(index) + 1)
}

/// Degree-(t-1) polynomial represented by coefficients [c0, c1, ..., c(t-1)]
#[derive(Clone, Debug)]
pub struct Poly<G: PrimeGroup> {
    pub coeffs: Vec<G::Scalar>,
}

impl<G: PrimeGroup> Poly<G> {
    /// Random polynomial with `t` coefficients, any `t` evaluations of which
    /// determine the constant term.
    pub fn random(t: usize) -> Self {
        Self::with_constant(t, G::random_scalar())
    }

    pub fn with_constant(t: usize, c0: G::Scalar) -> Self {
        let mut coeffs = Vec::with_capacity(t);
        coeffs.push(c0);
        for _ in 1..t {
            coeffs.push(G::random_scalar());
        }
        Poly { coeffs }
    }

    pub fn eval(&self, x: G::Scalar) -> G::Scalar {
        // Horner
        self.coeffs
            .iter()
            .rev()
            .fold(G::zero(), |acc, c| acc * x + *c)
    }

    /// Share handed to participant `index`.
    pub fn share_for(&self, index: u32) -> G::Scalar {
        self.eval(share_x::<G>(index))
    }

    pub fn secret(&self) -> G::Scalar {
        self.coeffs[0]
    }
}

fn check_indices(indices: &[u32], n: usize) -> Result<()> {
    let mut seen = BTreeSet::new();
    for &i in indices {
        if i as usize >= n {
            return Err(Error::IndexOutOfRange { index: i, n });
        }
        if !seen.insert(i) {
            return Err(Error::DuplicateIndex(i));
        }
    }
    Ok(())
}

/// Lagrange coefficient L_{i,SS}(0) = Π_{k∈SS\{i}} x_k/(x_k - x_i)
pub fn lagrange_coeff<G: PrimeGroup>(i: u32, ss: &[u32]) -> G::Scalar {
    let x_i = share_x::<G>(i);
    let mut num = G::one();
    let mut den = G::one();
    for &k in ss {
        if k == i {
            continue;
        }
        let x_k = share_x::<G>(k);
        num = num * x_k;
        den = den * (x_k - x_i);
    }
    num * G::invert(&den)
}

/// Coefficients for every index of `ss`, in the same order. Indices must be
/// unique.
pub fn lagrange_coefficients_at_zero<G: PrimeGroup>(ss: &[u32]) -> Result<Vec<G::Scalar>> {
    check_indices(ss, usize::MAX)?;
    Ok(ss.iter().map(|&i| lagrange_coeff::<G>(i, ss)).collect())
}

/// Interpolate the secret p(0) from `(index, p(x_index))` pairs.
pub fn recover_secret<G: PrimeGroup>(shares: &[(u32, G::Scalar)], t: usize) -> Result<G::Scalar> {
    if shares.len() < t {
        return Err(Error::InsufficientShares {
            required: t,
            provided: shares.len(),
        });
    }
    let ss: Vec<u32> = shares.iter().map(|(i, _)| *i).collect();
    let lambdas = lagrange_coefficients_at_zero::<G>(&ss)?;
    Ok(shares
        .iter()
        .zip(lambdas)
        .fold(G::zero(), |acc, ((_, s), l)| acc + *s * l))
}

/// Interpolate in the exponent: given shadows `x_i · C` of a committed
/// value, return `p(0) · C` without learning any `x_i`.
///
/// Requires at least `t` shadows with unique indices in `[0, n)`. All
/// supplied shadows take part; any consistent subset yields the same point.
#[instrument(level = "trace", skip_all, fields(t, n, provided = shadows.len()))]
pub fn recover_commitment<G: PrimeGroup>(
    shadows: &[Shadow<G>],
    t: usize,
    n: usize,
) -> Result<G::Element> {
    if shadows.len() < t {
        return Err(Error::InsufficientShares {
            required: t,
            provided: shadows.len(),
        });
    }
    let ss: Vec<u32> = shadows.iter().map(|s| s.index).collect();
    check_indices(&ss, n)?;

    Ok(sum_elements::<G>(
        shadows
            .iter()
            .map(|s| s.value * lagrange_coeff::<G>(s.index, &ss)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Ristretto;
    use curve25519_dalek::scalar::Scalar;

    #[test]
    fn lagrange_three_points() {
        // indices 0,1,2 sit at x = 1,2,3
        // λ_1 = 3, λ_2 = -3, λ_3 = 1
        let coeffs = lagrange_coefficients_at_zero::<Ristretto>(&[0, 1, 2]).unwrap();
        assert_eq!(coeffs[0], Scalar::from(3u32));
        assert_eq!(coeffs[1], -Scalar::from(3u32));
        assert_eq!(coeffs[2], Scalar::ONE);
    }

    #[test]
    fn lagrange_partition_of_unity() {
        for k in 1..=12u32 {
            let ss: Vec<u32> = (0..k).map(|i| i * 3).collect();
            let sum = lagrange_coefficients_at_zero::<Ristretto>(&ss)
                .unwrap()
                .into_iter()
                .fold(Scalar::ZERO, |a, c| a + c);
            assert_eq!(sum, Scalar::ONE, "k = {k}");
        }
    }

    #[test]
    fn any_t_shares_recover_the_secret() {
        let poly = Poly::<Ristretto>::random(3);
        let shares: Vec<(u32, Scalar)> = (0..6).map(|i| (i, poly.share_for(i))).collect();

        let a = recover_secret::<Ristretto>(&[shares[0], shares[2], shares[4]], 3).unwrap();
        let b = recover_secret::<Ristretto>(&[shares[5], shares[1], shares[3]], 3).unwrap();
        let all = recover_secret::<Ristretto>(&shares, 3).unwrap();
        assert_eq!(a, poly.secret());
        assert_eq!(b, poly.secret());
        assert_eq!(all, poly.secret());
    }

    #[test]
    fn too_few_shares_do_not_recover() {
        let poly = Poly::<Ristretto>::random(3);
        let shares: Vec<(u32, Scalar)> = (0..2).map(|i| (i, poly.share_for(i))).collect();
        assert_eq!(
            recover_secret::<Ristretto>(&shares, 3),
            Err(Error::InsufficientShares { required: 3, provided: 2 })
        );
    }

    #[test]
    fn commitment_recovery_matches_exponent() {
        let poly = Poly::<Ristretto>::random(2);
        let base = Ristretto::random_element();
        let shadows: Vec<Shadow<Ristretto>> = [1u32, 3]
            .iter()
            .map(|&i| Shadow { index: i, value: base * poly.share_for(i) })
            .collect();
        let got = recover_commitment(&shadows, 2, 4).unwrap();
        assert_eq!(got, base * poly.secret());
    }

    #[test]
    fn commitment_recovery_rejects_bad_index_sets() {
        let base = Ristretto::generator();
        let dup = vec![
            Shadow::<Ristretto> { index: 1, value: base },
            Shadow::<Ristretto> { index: 1, value: base },
        ];
        assert_eq!(recover_commitment(&dup, 2, 3), Err(Error::DuplicateIndex(1)));

        let out = vec![
            Shadow::<Ristretto> { index: 0, value: base },
            Shadow::<Ristretto> { index: 3, value: base },
        ];
        assert_eq!(
            recover_commitment(&out, 2, 3),
            Err(Error::IndexOutOfRange { index: 3, n: 3 })
        );

        assert_eq!(
            recover_commitment(&out[..1], 2, 3),
            Err(Error::InsufficientShares { required: 2, provided: 1 })
        );
    }
}
