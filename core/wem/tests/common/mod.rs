#![allow(dead_code)]

use wem::PackBuffer;

/// Two-entry codebook with 1-bit codes and no lookup, in standard form.
pub fn write_full_codebook(buf: &mut PackBuffer) {
    buf.write(0x564342, 24);
    buf.write(1, 16); // dimensions
    buf.write(2, 24); // entries
    buf.write(0, 1); // ordered
    buf.write(0, 1); // sparse
    buf.write(0, 5);
    buf.write(0, 5);
    buf.write(0, 4); // lookup type
}

/// One floor1, one type 2 residue, one mapping and a single short mode,
/// framing bit included.
pub fn write_full_tail(buf: &mut PackBuffer) {
    buf.write(0, 6); // floor count - 1
    buf.write(1, 16); // floor type
    buf.write(1, 5); // partitions
    buf.write(0, 4); // partition class
    buf.write(0, 3); // class dimension - 1
    buf.write(0, 2); // subclasses
    buf.write(0, 8); // subclass book + 1
    buf.write(0, 2); // multiplier - 1
    buf.write(4, 4); // range bits
    buf.write(5, 4); // x

    buf.write(0, 6); // residue count - 1
    buf.write(2, 16);
    buf.write(0, 24);
    buf.write(0, 24);
    buf.write(0, 24);
    buf.write(0, 6);
    buf.write(0, 8); // classbook
    buf.write(0, 3);
    buf.write(0, 1);

    buf.write(0, 6); // mapping count - 1
    buf.write(0, 16);
    buf.write(0, 1);
    buf.write(0, 1);
    buf.write(0, 2);
    buf.write(0, 8);
    buf.write(0, 8);
    buf.write(0, 8);

    buf.write(0, 6); // mode count - 1
    buf.write(0, 1); // short window
    buf.write(0, 16);
    buf.write(0, 16);
    buf.write(0, 8);

    buf.write(1, 1); // framing
}

/// Setup payload as Wwise stores it with inline codebooks: codebook count,
/// codebooks and the remaining fields, without the time domain.
pub fn inline_setup_payload() -> Vec<u8> {
    let mut buf = PackBuffer::new();
    buf.write(0, 8);
    write_full_codebook(&mut buf);
    write_full_tail(&mut buf);
    buf.into_bytes()
}

/// A 66-byte `fmt` chunk payload carrying the compact `vorb` block.
pub fn fmt_with_vorb(channels: u16, sample_rate: u32, audio_offset: u32, uid: u32) -> Vec<u8> {
    let mut fmt = Vec::with_capacity(66);
    fmt.extend(0xFFFFu16.to_le_bytes());
    fmt.extend(channels.to_le_bytes());
    fmt.extend(sample_rate.to_le_bytes());
    fmt.extend(8000u32.to_le_bytes());
    fmt.extend(0u16.to_le_bytes()); // block align
    fmt.extend(0u16.to_le_bytes()); // bits per sample
    fmt.extend(48u16.to_le_bytes()); // extra size
    fmt.extend(0u16.to_le_bytes());
    fmt.extend(4u32.to_le_bytes()); // channel mask

    let mut vorb = [0u8; 42];
    vorb[0..4].copy_from_slice(&512u32.to_le_bytes());
    vorb[4..8].copy_from_slice(&0x4Au32.to_le_bytes());
    vorb[16..20].copy_from_slice(&0u32.to_le_bytes());
    vorb[20..24].copy_from_slice(&audio_offset.to_le_bytes());
    vorb[36..40].copy_from_slice(&uid.to_le_bytes());
    vorb[40] = 8;
    vorb[41] = 11;
    fmt.extend(vorb);
    assert_eq!(fmt.len(), 66);
    fmt
}

fn chunk(out: &mut Vec<u8>, tag: &[u8; 4], payload: &[u8]) {
    out.extend(tag);
    out.extend((payload.len() as u32).to_le_bytes());
    out.extend(payload);
}

/// A complete WEM: inline full setup and `audio_packets` one-byte audio
/// packets, each a short-window packet of mode 0.
pub fn synthetic_wem(audio_packets: usize, uid: u32) -> Vec<u8> {
    let setup = inline_setup_payload();
    let mut data = Vec::new();
    data.extend((setup.len() as u16).to_le_bytes());
    data.extend(&setup);
    let audio_offset = data.len() as u32;
    for _ in 0..audio_packets {
        data.extend(1u16.to_le_bytes());
        data.push(0x00);
    }

    let mut body = b"WAVE".to_vec();
    chunk(&mut body, b"fmt ", &fmt_with_vorb(1, 44100, audio_offset, uid));
    chunk(&mut body, b"JUNK", &[0; 4]);
    chunk(&mut body, b"data", &data);

    let mut out = b"RIFF".to_vec();
    out.extend((body.len() as u32).to_le_bytes());
    out.extend(body);
    out
}
