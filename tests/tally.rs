use threshold_tally::chunking::{reassemble_messages, split_message, MessageChunk};
use threshold_tally::dkg::Deal;
use threshold_tally::elgamal::{decrypt, encrypt, extract_shadow};
use threshold_tally::keygen::{collect_certified, run_dkg_over, setup};
use threshold_tally::network::MemoryNetwork;
use threshold_tally::nizk::{prove_shadow, verify_shadow};
use threshold_tally::{
    create_threshold_shares, decrypt_long_messages, encrypt_long_messages, shuffle,
    shuffle_and_verify, verify_shuffle, Ciphertext, Error, PrimeGroup, Ristretto, ThresholdParams,
};

type G = Ristretto;

#[test]
fn any_threshold_subset_decrypts_a_vote() {
    let shares = create_threshold_shares::<G>(5, 3).unwrap();
    let pk = shares[0].public_key;
    let vote = G::embed(b"VOTE:A").unwrap();
    let ct = encrypt::<G>(&vote, &pk);

    // participants 1, 3 and 5
    let first: Vec<_> = [0, 2, 4].iter().map(|&i| extract_shadow(&ct, &shares[i])).collect();
    let m = decrypt(&ct, &first, 3, 5).unwrap();
    assert_eq!(G::extract(&m).unwrap(), b"VOTE:A");

    let second: Vec<_> = [3, 1, 0].iter().map(|&i| extract_shadow(&ct, &shares[i])).collect();
    assert_eq!(decrypt(&ct, &second, 3, 5).unwrap(), m);

    assert_eq!(
        decrypt(&ct, &first[..2], 3, 5).unwrap_err(),
        Error::InsufficientShares { required: 3, provided: 2 }
    );
}

#[test]
fn shadow_proofs_bind_to_the_share() {
    let shares = create_threshold_shares::<G>(4, 2).unwrap();
    let ct = encrypt::<G>(&G::embed(b"yes").unwrap(), &shares[0].public_key);
    let (shadow, proof) = prove_shadow(&ct, &shares[1]);
    assert!(verify_shadow(&ct, &shadow, &proof, &shares[0].public_share(1)));
    assert!(!verify_shadow(&ct, &shadow, &proof, &shares[0].public_share(2)));
}

#[test]
fn shuffled_batch_verifies_and_rejects_a_flipped_bit() {
    let shares = create_threshold_shares::<G>(3, 2).unwrap();
    let pk = shares[0].public_key;
    let cts: Vec<Ciphertext<G>> = ["a", "b", "c", "d"]
        .iter()
        .map(|v| encrypt::<G>(&G::embed(v.as_bytes()).unwrap(), &pk))
        .collect();

    let (mixed, proof) = shuffle(&pk, &cts).unwrap();
    assert!(verify_shuffle(&pk, &cts, &mixed, &proof));

    // Most single-bit flips leave no valid encoding and are refused at
    // decoding; walk the bits of c2 until a few flips do decode and check
    // that each of those is caught by the proof.
    let original = mixed[2].to_bytes();
    let mut refused = 0;
    let mut rejected = 0;
    for bit in 0..8 * G::ELEMENT_LEN {
        let mut bytes = original.clone();
        bytes[G::ELEMENT_LEN + bit / 8] ^= 1 << (bit % 8);
        match Ciphertext::<G>::from_bytes(&bytes) {
            Err(_) => refused += 1,
            Ok(flipped) => {
                assert_ne!(flipped, mixed[2]);
                let mut tampered = mixed.clone();
                tampered[2] = flipped;
                assert!(!verify_shuffle(&pk, &cts, &tampered, &proof));
                rejected += 1;
                if rejected == 4 {
                    break;
                }
            }
        }
    }
    assert_eq!(rejected, 4, "{refused} flips refused at decoding");
}

#[test]
fn duplicated_chunk_does_not_change_the_message() {
    let chunks: Vec<Vec<u8>> = split_message::<G>(b"Hello. My name is BOB. I vote for Smith.")
        .unwrap()
        .iter()
        .map(MessageChunk::to_bytes)
        .collect();
    let mut with_dup = chunks.clone();
    with_dup.push(chunks[1].clone());
    assert_eq!(
        reassemble_messages(&with_dup).unwrap(),
        reassemble_messages(&chunks).unwrap()
    );
}

#[test]
fn long_messages_through_mix_and_threshold_decryption() {
    let shares = create_threshold_shares::<G>(5, 3).unwrap();
    let pk = shares[0].public_key;
    let payloads = [
        "Hello. My name is BOB. I vote for Smith.",
        "HMMM... I pass.",
        "This is an example message. As you can see, these messages can be quite long!",
        "",
    ];
    let cts = encrypt_long_messages::<G, _>(&pk, &payloads).unwrap();
    let once = shuffle_and_verify(&pk, &cts).unwrap();
    let twice = shuffle_and_verify(&pk, &once).unwrap();

    let mut got = decrypt_long_messages(&twice, &shares[2..], 3, 5).unwrap();
    got.sort();
    let mut want: Vec<Vec<u8>> = payloads.iter().map(|p| p.as_bytes().to_vec()).collect();
    want.sort();
    assert_eq!(got, want);
}

#[test]
fn tampered_deal_still_yields_a_working_key() {
    let params = ThresholdParams::new(4, 3).unwrap();
    let participants = setup::<G>(params).unwrap();
    let net = MemoryNetwork::new(params.n);
    let done = run_dkg_over(participants, &net, |d: &mut Deal<G>| {
        if d.dealer == 2 && d.recipient == 0 {
            d.encrypted_share.ciphertext[0] ^= 0x80;
        }
        true
    })
    .unwrap();
    let shares = collect_certified(&done, params).unwrap();
    assert_eq!(shares.len(), 4);

    let m = G::embed(b"after complaint").unwrap();
    let ct = encrypt::<G>(&m, &shares[0].public_key);
    let shadows: Vec<_> = shares[..3].iter().map(|s| extract_shadow(&ct, s)).collect();
    assert_eq!(decrypt(&ct, &shadows, 3, 4).unwrap(), m);
}
