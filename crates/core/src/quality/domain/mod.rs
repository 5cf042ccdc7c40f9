pub mod heuristic_quality_scorer;
pub mod laplacian;
pub mod quality_scorer;
