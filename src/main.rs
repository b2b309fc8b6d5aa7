use threshold_tally::chunking::MAX_MESSAGE_LEN;
use threshold_tally::keygen::create_threshold_shares;
use threshold_tally::protocol::{
    decrypt_batch, decrypt_batch_verified, decrypt_long_messages, encrypt_batch,
    encrypt_long_messages, shuffle_and_verify,
};
use threshold_tally::{PrimeGroup, Result, Ristretto};

use std::time::{Duration, Instant};
use tracing::error;
use tracing_subscriber::EnvFilter;

type G = Ristretto;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Short,
    Verified,
    Long,
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::Short => "short",
            Mode::Verified => "short+proofs",
            Mode::Long => "long",
        }
    }
}

#[derive(Default, Clone, Debug)]
struct Timings {
    total: Duration,
    keygen: Duration,
    encrypt: Duration,
    shuffle: Duration,
    decrypt: Duration,
}

fn add(a: &mut Duration, b: Duration) { *a += b; }

fn avg(d: Duration, n: usize) -> Duration {
    if n == 0 { d } else { Duration::from_nanos((d.as_nanos() / n as u128) as u64) }
}

fn ballot(k: usize, mode: Mode) -> Vec<u8> {
    match mode {
        Mode::Long => format!("ballot {k}: ")
            .into_bytes()
            .into_iter()
            .cycle()
            .take(MAX_MESSAGE_LEN)
            .collect(),
        _ => format!("VOTE:{}", k % 4).into_bytes(),
    }
}

fn run_once(n: usize, t: usize, ballots: usize, mode: Mode) -> Result<(Timings, bool)> {
    let total_start = Instant::now();
    let mut tm = Timings::default();

    let t0 = Instant::now();
    let shares = create_threshold_shares::<G>(n, t)?;
    tm.keygen = t0.elapsed();
    let pk = shares[0].public_key;
    // the last t holders decrypt
    let holders = &shares[shares.len() - t..];

    let payloads: Vec<Vec<u8>> = (0..ballots).map(|k| ballot(k, mode)).collect();
    let mut want = payloads.clone();
    want.sort();

    let got = if mode == Mode::Long {
        let t1 = Instant::now();
        let cts = encrypt_long_messages::<G, _>(&pk, &payloads)?;
        tm.encrypt = t1.elapsed();

        let t2 = Instant::now();
        let mixed = shuffle_and_verify(&pk, &cts)?;
        tm.shuffle = t2.elapsed();

        let t3 = Instant::now();
        let out = decrypt_long_messages(&mixed, holders, t, n)?;
        tm.decrypt = t3.elapsed();
        out
    } else {
        let messages = payloads
            .iter()
            .map(|p| G::embed(p))
            .collect::<Result<Vec<_>>>()?;

        let t1 = Instant::now();
        let cts = encrypt_batch::<G>(&pk, &messages);
        tm.encrypt = t1.elapsed();

        let t2 = Instant::now();
        let mixed = shuffle_and_verify(&pk, &cts)?;
        tm.shuffle = t2.elapsed();

        let t3 = Instant::now();
        let plain = if mode == Mode::Verified {
            decrypt_batch_verified(&mixed, holders, n)?
        } else {
            decrypt_batch(&mixed, holders, t, n)?
        };
        tm.decrypt = t3.elapsed();
        plain.iter().map(G::extract).collect::<Result<Vec<_>>>()?
    };

    tm.total = total_start.elapsed();

    let mut got = got;
    got.sort();
    Ok((tm, got == want))
}

fn run_exp(n: usize, t: usize, ballots: usize, mode: Mode, reps: usize) {
    let mut sum = Timings::default();
    let mut ok = true;

    for _ in 0..reps {
        match run_once(n, t, ballots, mode) {
            Ok((tm, good)) => {
                ok &= good;
                add(&mut sum.total, tm.total);
                add(&mut sum.keygen, tm.keygen);
                add(&mut sum.encrypt, tm.encrypt);
                add(&mut sum.shuffle, tm.shuffle);
                add(&mut sum.decrypt, tm.decrypt);
            }
            Err(e) => {
                error!(n, t, mode = mode.name(), error = %e, "run failed");
                ok = false;
            }
        }
    }

    let avg = Timings {
        total: avg(sum.total, reps),
        keygen: avg(sum.keygen, reps),
        encrypt: avg(sum.encrypt, reps),
        shuffle: avg(sum.shuffle, reps),
        decrypt: avg(sum.decrypt, reps),
    };

    println!(
        "RESULT,n={},t={},ballots={},mode={},reps={},ok={},total_ms={:.3},keygen_ms={:.3},encrypt_ms={:.3},shuffle_ms={:.3},decrypt_ms={:.3}",
        n, t, ballots, mode.name(), reps, ok,
        avg.total.as_secs_f64()*1e3,
        avg.keygen.as_secs_f64()*1e3,
        avg.encrypt.as_secs_f64()*1e3,
        avg.shuffle.as_secs_f64()*1e3,
        avg.decrypt.as_secs_f64()*1e3,
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let reps = 5;
    let ballots = 32;

    for n in [4, 8, 16, 32] {
        let t = n/2 + 1;
        for m in [Mode::Short, Mode::Verified, Mode::Long] {
            run_exp(n, t, ballots, m, reps);
        }
    }

    let n = 16;
    for ballots in [8, 64, 256] {
        for m in [Mode::Short, Mode::Long] {
            run_exp(n, 9, ballots, m, reps);
        }
    }
}
