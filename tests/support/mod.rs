#![allow(dead_code)]

pub mod homeval_env;
pub mod housing_csv;
