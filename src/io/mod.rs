pub mod stream;
pub mod wav;

pub use stream::{IqStreamReader, StreamFormat};
pub use wav::{read_iq_wav, write_iq_wav};
