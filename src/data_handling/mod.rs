pub mod ring_buffer;
pub mod sample;
pub mod sensor_channel;

pub use ring_buffer::RingBuffer;
pub use sample::{AccelerationTriplet, Axis, Sample};
pub use sensor_channel::{DataSink, SensorChannel};
