pub mod kmer;
