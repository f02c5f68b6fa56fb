#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::uninlined_format_args,
    clippy::single_match_else,
    clippy::collapsible_if,
    clippy::new_without_default,
    clippy::redundant_field_names,
    clippy::struct_field_names,
    clippy::similar_names,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::match_same_arms,
    clippy::too_many_lines,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
)]

pub mod error;
pub mod hash;
pub mod kvlm;
pub mod object;
pub mod storage;
pub mod repository;
pub mod refs;
pub mod index;
pub mod tree;
pub mod ignore;
pub mod config;
pub mod status;
pub mod commit;
pub mod add;
pub mod remove;
pub mod checkout;
pub mod log;
pub mod cat_file;
pub mod hash_object;
pub mod ls_tree;
pub mod ls_files;
pub mod tag;
pub mod util;
