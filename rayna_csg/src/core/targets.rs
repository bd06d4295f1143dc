use crate::tracing_targets;

tracing_targets! {
    MAIN = "main",
    SHAPE = "shape",
    CSG = "csg",
    SOLVER = "solver",
    ACCEL = "accel",
    POOL = "pool",
    QUERY = "query",
}
