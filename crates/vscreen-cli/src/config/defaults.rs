use vscreen::engine::config::{
    DEFAULT_BOX_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_ENERGY_RANGE, DEFAULT_EXHAUSTIVENESS,
    DEFAULT_NUM_MODES,
};
use vscreen::workflows::virtual_screening::AUTODOCK_VINA;

pub struct DefaultsConfig {
    pub n_cpu: i32,
    pub chunk_size: usize,
    pub output_format: &'static str,
    pub soft_fail: usize,
    pub similarity_cutoff: f64,
    pub engine: &'static str,
    pub box_size: [f64; 3],
    pub exhaustiveness: u32,
    pub num_modes: u32,
    pub energy_range: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            n_cpu: -1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_format: "sdf",
            soft_fail: 0,
            similarity_cutoff: 0.9,
            engine: AUTODOCK_VINA,
            box_size: [DEFAULT_BOX_SIZE; 3],
            exhaustiveness: DEFAULT_EXHAUSTIVENESS,
            num_modes: DEFAULT_NUM_MODES,
            energy_range: DEFAULT_ENERGY_RANGE,
        }
    }
}
