pub mod purge_zeros;
