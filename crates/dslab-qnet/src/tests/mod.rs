mod model;
mod pool;
