/// Cooperative stop request for a scheduler run, checked once per tick.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    pub reason: String,
}
