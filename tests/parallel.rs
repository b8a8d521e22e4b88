mod common;

use common::{minimal_package, para};
use docx_tidy::{Config, Mode, tidy_docx_bytes};
use rayon::prelude::*;

/// Documents are independent; tidying them concurrently gives the same
/// result as tidying them one by one.
#[test]
fn documents_tidy_independently_in_parallel() {
    let inputs: Vec<Vec<u8>> = (1..=8)
        .map(|n| {
            let body: String = (1..=n).map(|i| para(&format!("{i}. 第{i}项"))).collect();
            minimal_package(&format!("{}{body}", para("第一章 绪论")))
        })
        .collect();
    let mut config = Config::default();
    config.mode = Mode::Rule;

    let sequential: Vec<usize> = inputs
        .iter()
        .map(|b| tidy_docx_bytes(b, &config, None).unwrap().1.actions.text_list_converted_to_numpr)
        .collect();
    let parallel: Vec<usize> = inputs
        .par_iter()
        .map(|b| tidy_docx_bytes(b, &config, None).unwrap().1.actions.text_list_converted_to_numpr)
        .collect();

    assert_eq!(sequential, (1..=8).collect::<Vec<_>>());
    assert_eq!(parallel, sequential);
}
