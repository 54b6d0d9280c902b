/// Reed-Solomon error correction for QR codeword blocks
///
/// QR codes use RS over GF(256) with primitive polynomial
/// x^8 + x^4 + x^3 + x^2 + 1 (0x11D), generator base 0.
use thiserror::Error;

const PRIMITIVE: u16 = 0x11D;

const fn build_tables() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    while i < 512 {
        exp[i] = exp[i - 255];
        i += 1;
    }
    (exp, log)
}

static TABLES: ([u8; 512], [u8; 256]) = build_tables();

/// GF(256) arithmetic using log/exp tables
pub struct Gf256;

impl Gf256 {
    #[inline]
    fn exp(i: usize) -> u8 {
        TABLES.0[i]
    }

    #[inline]
    fn log(a: u8) -> usize {
        TABLES.1[a as usize] as usize
    }

    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        Self::exp(Self::log(a) + Self::log(b))
    }

    /// `a / b`; `b` must be non-zero
    pub fn div(a: u8, b: u8) -> u8 {
        debug_assert!(b != 0, "division by zero in GF(256)");
        if a == 0 || b == 0 {
            return 0;
        }
        Self::exp(Self::log(a) + 255 - Self::log(b))
    }

    /// alpha^n
    pub fn alpha_pow(n: usize) -> u8 {
        Self::exp(n % 255)
    }

    /// alpha^-n
    pub fn alpha_pow_neg(n: usize) -> u8 {
        Self::exp((255 - n % 255) % 255)
    }

    /// Evaluate a polynomial stored lowest power first
    fn eval_ascending(poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0u8, |acc, &c| Self::mul(acc, x) ^ c)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReedSolomonError {
    #[error("block longer than 255 codewords")]
    BlockTooLong,
    #[error("more errors than the block can correct")]
    TooManyErrors,
}

/// Decoder for one interleaved block of `data + ecc` codewords
pub struct ReedSolomonDecoder {
    num_ecc_codewords: usize,
}

impl ReedSolomonDecoder {
    pub fn new(num_ecc_codewords: usize) -> Self {
        Self { num_ecc_codewords }
    }

    /// Correct `received` in place; returns how many codewords were fixed.
    ///
    /// Either the whole block ends up consistent or an error is returned and
    /// the caller must discard it.
    pub fn decode(&self, received: &mut [u8]) -> Result<usize, ReedSolomonError> {
        let n = received.len();
        if n > 255 {
            return Err(ReedSolomonError::BlockTooLong);
        }
        if n <= self.num_ecc_codewords {
            return Err(ReedSolomonError::TooManyErrors);
        }

        let syndromes = self.syndromes(received);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        let sigma = Self::error_locator(&syndromes)?;
        let errors = sigma.len() - 1;
        if errors * 2 > self.num_ecc_codewords {
            return Err(ReedSolomonError::TooManyErrors);
        }

        let positions = Self::error_positions(&sigma, n);
        if positions.len() != errors {
            return Err(ReedSolomonError::TooManyErrors);
        }

        let omega = Self::error_evaluator(&syndromes, &sigma);
        // formal derivative: only odd powers survive in characteristic 2
        let derivative: Vec<u8> = (1..sigma.len())
            .map(|i| if i % 2 == 1 { sigma[i] } else { 0 })
            .collect();
        for &pos in &positions {
            let power = n - 1 - pos;
            let x_inv = Gf256::alpha_pow_neg(power);
            let sigma_prime = Gf256::eval_ascending(&derivative, x_inv);
            if sigma_prime == 0 {
                return Err(ReedSolomonError::TooManyErrors);
            }
            let magnitude = Gf256::mul(
                Gf256::alpha_pow(power),
                Gf256::div(Gf256::eval_ascending(&omega, x_inv), sigma_prime),
            );
            received[pos] ^= magnitude;
        }

        if self.syndromes(received).iter().any(|&s| s != 0) {
            return Err(ReedSolomonError::TooManyErrors);
        }
        Ok(positions.len())
    }

    /// S_i = r(alpha^i); `received[0]` is the highest-power coefficient
    fn syndromes(&self, received: &[u8]) -> Vec<u8> {
        (0..self.num_ecc_codewords)
            .map(|i| {
                let x = Gf256::alpha_pow(i);
                received.iter().fold(0u8, |acc, &c| Gf256::mul(acc, x) ^ c)
            })
            .collect()
    }

    /// Berlekamp-Massey; returns the locator lowest power first, trimmed
    fn error_locator(syndromes: &[u8]) -> Result<Vec<u8>, ReedSolomonError> {
        let mut sigma = vec![1u8];
        let mut prev = vec![1u8];
        let mut l = 0usize;
        let mut m = 1usize;
        let mut prev_delta = 1u8;

        for i in 0..syndromes.len() {
            let mut delta = syndromes[i];
            for j in 1..=l.min(sigma.len() - 1) {
                delta ^= Gf256::mul(sigma[j], syndromes[i - j]);
            }

            if delta == 0 {
                m += 1;
                continue;
            }

            let coef = Gf256::div(delta, prev_delta);
            let mut next = sigma.clone();
            if next.len() < prev.len() + m {
                next.resize(prev.len() + m, 0);
            }
            for (k, &p) in prev.iter().enumerate() {
                next[k + m] ^= Gf256::mul(coef, p);
            }

            if 2 * l <= i {
                prev = std::mem::replace(&mut sigma, next);
                l = i + 1 - l;
                prev_delta = delta;
                m = 1;
            } else {
                sigma = next;
                m += 1;
            }
        }

        while sigma.len() > 1 && sigma[sigma.len() - 1] == 0 {
            sigma.pop();
        }
        if sigma.len() - 1 != l {
            return Err(ReedSolomonError::TooManyErrors);
        }
        Ok(sigma)
    }

    /// Chien search: positions whose inverse locator is a root of sigma
    fn error_positions(sigma: &[u8], n: usize) -> Vec<usize> {
        (0..n)
            .filter(|&pos| {
                let x_inv = Gf256::alpha_pow_neg(n - 1 - pos);
                Gf256::eval_ascending(sigma, x_inv) == 0
            })
            .collect()
    }

    /// Omega(x) = S(x) * sigma(x) mod x^(2t)
    fn error_evaluator(syndromes: &[u8], sigma: &[u8]) -> Vec<u8> {
        let len = syndromes.len();
        let mut omega = vec![0u8; len];
        for (i, &s) in sigma.iter().enumerate() {
            for (j, &syn) in syndromes.iter().enumerate() {
                if i + j < len {
                    omega[i + j] ^= Gf256::mul(s, syn);
                }
            }
        }
        omega
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Systematic RS encoder: appends `num_ecc` codewords to `data`.
    /// Generator roots are alpha^0 .. alpha^(num_ecc-1).
    pub(crate) fn rs_encode(data: &[u8], num_ecc: usize) -> Vec<u8> {
        // generator, highest power first, monic
        let mut generator = vec![1u8];
        for i in 0..num_ecc {
            let root = Gf256::alpha_pow(i);
            let mut next = vec![0u8; generator.len() + 1];
            for (k, &g) in generator.iter().enumerate() {
                next[k] ^= g;
                next[k + 1] ^= Gf256::mul(g, root);
            }
            generator = next;
        }

        let mut remainder = vec![0u8; num_ecc];
        for &d in data {
            let factor = d ^ remainder[0];
            remainder.rotate_left(1);
            remainder[num_ecc - 1] = 0;
            for j in 0..num_ecc {
                remainder[j] ^= Gf256::mul(generator[j + 1], factor);
            }
        }

        let mut codeword = data.to_vec();
        codeword.extend_from_slice(&remainder);
        codeword
    }

    #[test]
    fn test_gf256_basic() {
        assert_eq!(Gf256::mul(0, 5), 0);
        assert_eq!(Gf256::mul(5, 0), 0);
        assert_eq!(Gf256::div(0, 5), 0);
        assert_eq!(Gf256::div(7, 7), 1);
        assert_eq!(Gf256::div(123, 123), 1);
        assert_eq!(Gf256::mul(Gf256::div(200, 13), 13), 200);
        // alpha^8 = x^4 + x^3 + x^2 + 1
        assert_eq!(Gf256::alpha_pow(8), 0x1D);
        assert_eq!(Gf256::alpha_pow(255), 1);
        assert_eq!(Gf256::mul(Gf256::alpha_pow(7), Gf256::alpha_pow_neg(7)), 1);
    }

    #[test]
    fn test_encoder_produces_zero_syndromes() {
        let codeword = rs_encode(&[0x40, 0xD2, 0x75, 0x47, 0x76], 10);
        let decoder = ReedSolomonDecoder::new(10);
        assert!(decoder.syndromes(&codeword).iter().all(|&s| s == 0));
    }

    #[test]
    fn test_known_qr_block() {
        // Version 1-M "01234567" data codewords and their published ECC.
        let data = [
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
            0xEC, 0x11,
        ];
        let codeword = rs_encode(&data, 10);
        assert_eq!(
            &codeword[16..],
            &[0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55]
        );
    }

    #[test]
    fn test_rs_no_errors() {
        let data = vec![0x10, 0x20, 0x30, 0x40, 0x50, 0x60];
        let mut codeword = rs_encode(&data, 10);
        let decoder = ReedSolomonDecoder::new(10);
        assert_eq!(decoder.decode(&mut codeword), Ok(0));
        assert_eq!(&codeword[..data.len()], &data);
    }

    #[test]
    fn test_rs_correct_single_error() {
        let data = vec![0x00; 10];
        let mut codeword = rs_encode(&data, 10);
        codeword[3] ^= 0xAB;

        let decoder = ReedSolomonDecoder::new(10);
        assert_eq!(decoder.decode(&mut codeword), Ok(1));
        assert_eq!(&codeword[..data.len()], &data);
    }

    #[test]
    fn test_rs_correct_up_to_capacity() {
        let data = vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        let mut codeword = rs_encode(&data, 10);
        let original = codeword.clone();
        for (pos, flip) in [(0, 0xFF), (4, 0x42), (7, 0x13), (12, 0x01), (17, 0x80)] {
            codeword[pos] ^= flip;
        }

        let decoder = ReedSolomonDecoder::new(10);
        assert_eq!(decoder.decode(&mut codeword), Ok(5));
        assert_eq!(codeword, original);
    }

    #[test]
    fn test_rs_errors_in_ecc_tail() {
        let data = vec![0x01, 0x02, 0x03, 0x04, 0x05];
        let mut codeword = rs_encode(&data, 8);
        let total = codeword.len();
        codeword[total - 1] ^= 0xFF;
        codeword[total - 2] ^= 0x33;

        let decoder = ReedSolomonDecoder::new(8);
        assert!(decoder.decode(&mut codeword).is_ok());
        assert_eq!(&codeword[..data.len()], &data);
    }

    #[test]
    fn test_rs_rejects_beyond_capacity() {
        let data: Vec<u8> = (0..20).collect();
        let mut codeword = rs_encode(&data, 6);
        for pos in [1, 5, 9, 13] {
            codeword[pos] ^= 0x5A;
        }
        let decoder = ReedSolomonDecoder::new(6);
        // Four errors exceed the three this block can fix: either detected,
        // or (rarely) a miscorrection that still leaves a consistent codeword.
        match decoder.decode(&mut codeword) {
            Err(ReedSolomonError::TooManyErrors) => {}
            Ok(_) => assert!(decoder.syndromes(&codeword).iter().all(|&s| s == 0)),
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }
}
