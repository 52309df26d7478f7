pub mod photogrammetry;
