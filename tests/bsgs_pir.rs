//! End-to-end tests of the BSGS PIR pipeline.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use bsgs_pir::keys::{AutoKey, AutoKeyBsgsRns};
use bsgs_pir::math::ErrorSampler;
use bsgs_pir::params::ParameterSet;
use bsgs_pir::pir::{
    compute_permutation_matrix, database_to_bsgs_ntt, decrypt_bsgs, decrypt_bsgs_single,
    matrix_vector_mul, matrix_vector_mul_bsgs, matrix_vector_mul_bsgs_rns_crt,
    matrix_vector_mul_bsgs_rns_crt_large, preprocess_database, query_bsgs, query_bsgs_rns,
    PirContext,
};
use bsgs_pir::rgsw::{external_product, RgswCiphertext};
use bsgs_pir::rlwe::Secret;

/// M[i][j] = (i * 7 + j) mod p.
fn linear_database(n: usize, p: u64) -> Vec<Vec<u64>> {
    (0..n)
        .map(|i| (0..n / 2).map(|j| ((i * 7 + j) as u64) % p).collect())
        .collect()
}

fn random_database(n: usize, p: u64, rng: &mut ChaCha20Rng) -> Vec<Vec<u64>> {
    (0..n)
        .map(|_| (0..n / 2).map(|_| rng.gen_range(0..p)).collect())
        .collect()
}

struct Client {
    secret: Secret,
    sampler: ErrorSampler,
    rng: ChaCha20Rng,
}

impl Client {
    fn new(srv: &PirContext, seed: u64) -> Self {
        let mut sampler = ErrorSampler::with_seed(seed);
        let secret = Secret::new(srv.params.n, srv.params.crt_mod, &mut sampler);
        Self {
            secret,
            sampler,
            rng: ChaCha20Rng::seed_from_u64(seed + 1),
        }
    }

    fn rns_keys(&mut self, srv: &PirContext, n1: usize) -> AutoKeyBsgsRns {
        let mut autokey = AutoKeyBsgsRns::new(&srv.params);
        autokey.bsgs_keygen(
            &self.secret,
            n1,
            &srv.ctx_crt,
            &srv.ctx_bs,
            &mut self.sampler,
            &mut self.rng,
        );
        autokey
    }
}

/// Runs the RNS pipeline for one column and returns the decrypted rows.
fn retrieve_column(
    srv: &PirContext,
    client: &mut Client,
    matrix: &[Vec<u64>],
    n1: usize,
    u: usize,
) -> Vec<u64> {
    let db = preprocess_database(&srv.params, &srv.encoding, &[matrix.to_vec()], n1).unwrap();
    let autokey = client.rns_keys(srv, n1);
    let permutations = compute_permutation_matrix(&srv.encoding, n1);

    let query = query_bsgs_rns(
        &srv.params,
        &srv.encoding,
        &client.secret,
        u,
        &srv.ctx_crt,
        &srv.ctx_bs,
        &mut client.sampler,
        &mut client.rng,
    );

    let response =
        matrix_vector_mul_bsgs_rns_crt(&query, &db, &autokey, n1, &permutations, srv).unwrap();

    decrypt_bsgs(&srv.params, &srv.encoding, &response, &client.secret, &srv.ctx_crt)
}

#[test]
fn retrieves_linear_database_column() {
    let srv = PirContext::new(ParameterSet::n256()).unwrap();
    let mut client = Client::new(&srv, 101);
    let matrix = linear_database(srv.params.n, srv.params.bsgs_p);
    let u = 3usize;

    let rows = retrieve_column(&srv, &mut client, &matrix, 16, u);

    for (row, &value) in rows.iter().enumerate() {
        assert_eq!(value, matrix[row][u], "row {row}");
    }
}

#[test]
fn boundary_baby_step_sizes_agree() {
    // N1 = 1 is pure giant-step, N1 = N/2 pure baby-step; both must match
    // an intermediate split.
    let srv = PirContext::new(ParameterSet::n256()).unwrap();
    let matrix = linear_database(srv.params.n, srv.params.bsgs_p);
    let u = 29usize;

    let mut reference = None;
    for n1 in [1usize, 16, srv.params.n / 2] {
        let mut client = Client::new(&srv, 103);
        let rows = retrieve_column(&srv, &mut client, &matrix, n1, u);
        match &reference {
            None => reference = Some(rows),
            Some(expected) => assert_eq!(&rows, expected, "N1 = {n1} diverges"),
        }
    }

    let expected: Vec<u64> = (0..srv.params.n).map(|row| matrix[row][u]).collect();
    assert_eq!(reference.unwrap(), expected);
}

#[test]
fn single_modulus_path_retrieves_column() {
    let srv = PirContext::new(ParameterSet::n256()).unwrap();
    let mut client = Client::new(&srv, 105);
    let matrix = linear_database(srv.params.n, srv.params.bsgs_p);
    let n1 = 16usize;
    let u = 40usize;

    let rows = database_to_bsgs_ntt(&srv.params, &srv.encoding, &matrix, srv.params.big_mod, n1)
        .unwrap();

    let secret_big = Secret::new(srv.params.n, srv.params.big_mod, &mut client.sampler);
    let mut autokey = AutoKey::new(srv.params.n, srv.params.big_mod, srv.params.ks_gadget_single());
    autokey.bsgs_keygen(&secret_big, n1, &srv.ctx_big, &mut client.sampler, &mut client.rng);
    let permutations = compute_permutation_matrix(&srv.encoding, n1);

    let query = query_bsgs(
        &srv.params,
        &srv.encoding,
        &secret_big,
        u,
        &srv.ctx_big,
        &mut client.sampler,
        &mut client.rng,
    );

    let response =
        matrix_vector_mul_bsgs(&query, &rows, &autokey, n1, &permutations, &srv).unwrap();
    let decrypted =
        decrypt_bsgs_single(&srv.params, &srv.encoding, &response, &secret_big, &srv.ctx_big);

    for (row, &value) in decrypted.iter().enumerate() {
        assert_eq!(value, matrix[row][u], "row {row}");
    }
}

#[test]
fn plain_fold_matches_bsgs_fold() {
    let srv = PirContext::new(ParameterSet::n256()).unwrap();
    let mut client = Client::new(&srv, 107);
    let matrix = linear_database(srv.params.n, srv.params.bsgs_p);
    let u = 11usize;

    let secret_big = Secret::new(srv.params.n, srv.params.big_mod, &mut client.sampler);
    let gadget = srv.params.ks_gadget_single();

    // Keys for the plain fold (N1 = 1: every index is a giant step).
    let mut plain_key = AutoKey::new(srv.params.n, srv.params.big_mod, gadget);
    plain_key.bsgs_keygen(&secret_big, 1, &srv.ctx_big, &mut client.sampler, &mut client.rng);

    let n1 = 16usize;
    let mut bsgs_key = AutoKey::new(srv.params.n, srv.params.big_mod, gadget);
    bsgs_key.bsgs_keygen(&secret_big, n1, &srv.ctx_big, &mut client.sampler, &mut client.rng);

    let query = query_bsgs(
        &srv.params,
        &srv.encoding,
        &secret_big,
        u,
        &srv.ctx_big,
        &mut client.sampler,
        &mut client.rng,
    );

    let rows_plain =
        database_to_bsgs_ntt(&srv.params, &srv.encoding, &matrix, srv.params.big_mod, 1).unwrap();
    let plain = matrix_vector_mul(&query, &rows_plain, &plain_key, &srv).unwrap();

    let rows_bsgs =
        database_to_bsgs_ntt(&srv.params, &srv.encoding, &matrix, srv.params.big_mod, n1).unwrap();
    let permutations = compute_permutation_matrix(&srv.encoding, n1);
    let bsgs =
        matrix_vector_mul_bsgs(&query, &rows_bsgs, &bsgs_key, n1, &permutations, &srv).unwrap();

    let dec_plain =
        decrypt_bsgs_single(&srv.params, &srv.encoding, &plain, &secret_big, &srv.ctx_big);
    let dec_bsgs =
        decrypt_bsgs_single(&srv.params, &srv.encoding, &bsgs, &secret_big, &srv.ctx_big);
    assert_eq!(dec_plain, dec_bsgs);

    for (row, &value) in dec_plain.iter().enumerate() {
        assert_eq!(value, matrix[row][u], "row {row}");
    }
}

#[test]
fn packed_copies_fold_independently() {
    // Two packed copies produce two responses, each carrying its own
    // column; an external product by RGSW(X^0) = RGSW(1) preserves them.
    let srv = PirContext::new(ParameterSet::n256()).unwrap();
    let mut client = Client::new(&srv, 109);
    let n1 = 16usize;
    let u = 60usize;

    let mut rng = ChaCha20Rng::seed_from_u64(110);
    let matrices = vec![
        random_database(srv.params.n, srv.params.bsgs_p, &mut rng),
        random_database(srv.params.n, srv.params.bsgs_p, &mut rng),
    ];

    let db = preprocess_database(&srv.params, &srv.encoding, &matrices, n1).unwrap();
    let autokey = client.rns_keys(&srv, n1);
    let permutations = compute_permutation_matrix(&srv.encoding, n1);

    let query = query_bsgs_rns(
        &srv.params,
        &srv.encoding,
        &client.secret,
        u,
        &srv.ctx_crt,
        &srv.ctx_bs,
        &mut client.sampler,
        &mut client.rng,
    );

    let responses =
        matrix_vector_mul_bsgs_rns_crt_large(&query, &db, &autokey, n1, &permutations, 2, &srv)
            .unwrap();
    assert_eq!(responses.len(), 2);

    for (copy, response) in responses.iter().enumerate() {
        let rows =
            decrypt_bsgs(&srv.params, &srv.encoding, response, &client.secret, &srv.ctx_crt);
        for (row, &value) in rows.iter().enumerate() {
            assert_eq!(value, matrices[copy][row][u], "copy {copy}, row {row}");
        }
    }

    // Second-dimension fold with the identity selector.
    let selector = RgswCiphertext::encrypt_monomial(
        &client.secret,
        0,
        srv.params.rgsw_gadget,
        &srv.ctx_crt,
        &mut client.sampler,
        &mut client.rng,
    );
    let selected = external_product(&responses[0], &selector, &srv.ctx_crt);
    let rows = decrypt_bsgs(&srv.params, &srv.encoding, &selected, &client.secret, &srv.ctx_crt);
    for (row, &value) in rows.iter().enumerate() {
        assert_eq!(value, matrices[0][row][u], "row {row}");
    }
}

#[test]
#[ignore = "large parameter set; run with --ignored"]
fn golden_n2048_random_database() {
    let srv = PirContext::new(ParameterSet::n2048()).unwrap();
    srv.init_thread_pool();
    let mut client = Client::new(&srv, 111);
    let mut rng = ChaCha20Rng::seed_from_u64(112);

    let matrix = random_database(srv.params.n, srv.params.bsgs_p, &mut rng);
    let u = rng.gen_range(0..srv.params.half_n());

    let rows = retrieve_column(&srv, &mut client, &matrix, 128, u);
    for (row, &value) in rows.iter().enumerate() {
        assert_eq!(value, matrix[row][u], "row {row}");
    }
}

#[test]
#[ignore = "large parameter set; run with --ignored"]
fn golden_n2048_sixteen_packed_copies() {
    let srv = PirContext::new(ParameterSet::n2048()).unwrap();
    srv.init_thread_pool();
    let mut client = Client::new(&srv, 115);
    let mut rng = ChaCha20Rng::seed_from_u64(116);
    let n1 = 128usize;
    let r = 16usize;
    let u = rng.gen_range(0..srv.params.half_n());

    let matrices: Vec<Vec<Vec<u64>>> = (0..r)
        .map(|_| random_database(srv.params.n, srv.params.bsgs_p, &mut rng))
        .collect();

    let db = preprocess_database(&srv.params, &srv.encoding, &matrices, n1).unwrap();
    let autokey = client.rns_keys(&srv, n1);
    let permutations = compute_permutation_matrix(&srv.encoding, n1);

    let query = query_bsgs_rns(
        &srv.params,
        &srv.encoding,
        &client.secret,
        u,
        &srv.ctx_crt,
        &srv.ctx_bs,
        &mut client.sampler,
        &mut client.rng,
    );

    let responses =
        matrix_vector_mul_bsgs_rns_crt_large(&query, &db, &autokey, n1, &permutations, r, &srv)
            .unwrap();
    assert_eq!(responses.len(), r);

    for (copy, response) in responses.iter().enumerate() {
        let rows =
            decrypt_bsgs(&srv.params, &srv.encoding, response, &client.secret, &srv.ctx_crt);
        for (row, &value) in rows.iter().enumerate() {
            assert_eq!(value, matrices[copy][row][u], "copy {copy}, row {row}");
        }
    }
}

#[test]
#[ignore = "large parameter set; run with --ignored"]
fn golden_n4096_strided_column() {
    let srv = PirContext::new(ParameterSet::n4096()).unwrap();
    srv.init_thread_pool();
    let mut client = Client::new(&srv, 113);
    let mut rng = ChaCha20Rng::seed_from_u64(114);
    let n1 = 128usize;
    let u = 123usize;

    let mut matrices = Vec::new();
    for _ in 0..4 {
        let mut m = random_database(srv.params.n, srv.params.bsgs_p, &mut rng);
        for (i, row) in m.iter_mut().enumerate() {
            row[u] = (i + 1) as u64 % srv.params.bsgs_p;
        }
        matrices.push(m);
    }

    let db = preprocess_database(&srv.params, &srv.encoding, &matrices, n1).unwrap();
    let autokey = client.rns_keys(&srv, n1);
    let permutations = compute_permutation_matrix(&srv.encoding, n1);

    let query = query_bsgs_rns(
        &srv.params,
        &srv.encoding,
        &client.secret,
        u,
        &srv.ctx_crt,
        &srv.ctx_bs,
        &mut client.sampler,
        &mut client.rng,
    );

    let responses =
        matrix_vector_mul_bsgs_rns_crt_large(&query, &db, &autokey, n1, &permutations, 4, &srv)
            .unwrap();

    for response in &responses {
        let rows =
            decrypt_bsgs(&srv.params, &srv.encoding, response, &client.secret, &srv.ctx_crt);
        for (row, &value) in rows.iter().enumerate() {
            assert_eq!(value, (row + 1) as u64 % srv.params.bsgs_p, "row {row}");
        }
    }
}
