/*!
 * Minimal TrueType fonts for rendering tests.
 *
 * The generated font has `cmap` (format 12), `head`, `hhea`, `hmtx` and
 * `maxp` tables and no outlines. Glyph 0 is `.notdef`; every character of the
 * requested ranges maps to the next glyph id.
 */

const UNITS_PER_EM: u16 = 1000;

/// Build a font covering `ranges`, every glyph `advance` units wide
pub fn build_truetype(ranges: &[(char, char)], advance: u16) -> Vec<u8> {
    let mut ranges = ranges.to_vec();
    ranges.sort();

    let mut groups = Vec::new();
    let mut next_glyph = 1u32;
    for (start, end) in &ranges {
        let (start, end) = (*start as u32, *end as u32);
        groups.push((start, end, next_glyph));
        next_glyph += end - start + 1;
    }
    let num_glyphs = u16::try_from(next_glyph).expect("too many glyphs for a test font");

    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap(&groups)),
        (b"head", head(advance)),
        (b"hhea", hhea(advance, num_glyphs)),
        (b"hmtx", hmtx(advance, num_glyphs)),
        (b"maxp", maxp(num_glyphs)),
    ];

    let mut font = Vec::new();
    font.extend(0x0001_0000u32.to_be_bytes());
    font.extend((tables.len() as u16).to_be_bytes());
    font.extend([0u8; 6]);

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend(*tag);
        font.extend(0u32.to_be_bytes());
        font.extend((offset as u32).to_be_bytes());
        font.extend((data.len() as u32).to_be_bytes());

        body.extend(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }

    font.extend(body);
    font
}

fn cmap(groups: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut table = Vec::new();
    table.extend(0u16.to_be_bytes());
    table.extend(1u16.to_be_bytes());
    // Windows, Unicode full repertoire
    table.extend(3u16.to_be_bytes());
    table.extend(10u16.to_be_bytes());
    table.extend(12u32.to_be_bytes());

    table.extend(12u16.to_be_bytes());
    table.extend(0u16.to_be_bytes());
    table.extend((16 + 12 * groups.len() as u32).to_be_bytes());
    table.extend(0u32.to_be_bytes());
    table.extend((groups.len() as u32).to_be_bytes());
    for (start, end, glyph) in groups {
        table.extend(start.to_be_bytes());
        table.extend(end.to_be_bytes());
        table.extend(glyph.to_be_bytes());
    }
    table
}

fn head(advance: u16) -> Vec<u8> {
    let mut table = Vec::new();
    table.extend(0x0001_0000u32.to_be_bytes());
    table.extend(0x0001_0000u32.to_be_bytes());
    table.extend(0u32.to_be_bytes());
    table.extend(0x5F0F_3CF5u32.to_be_bytes());
    table.extend(0u16.to_be_bytes());
    table.extend(UNITS_PER_EM.to_be_bytes());
    table.extend([0u8; 16]);
    for bound in [0i16, -200, advance as i16, 800] {
        table.extend(bound.to_be_bytes());
    }
    table.extend(0u16.to_be_bytes());
    table.extend(8u16.to_be_bytes());
    table.extend(2i16.to_be_bytes());
    table.extend(0i16.to_be_bytes());
    table.extend(0i16.to_be_bytes());
    table
}

fn hhea(advance: u16, num_glyphs: u16) -> Vec<u8> {
    let mut table = Vec::new();
    table.extend(0x0001_0000u32.to_be_bytes());
    table.extend(800i16.to_be_bytes());
    table.extend((-200i16).to_be_bytes());
    table.extend(0i16.to_be_bytes());
    table.extend(advance.to_be_bytes());
    table.extend(0i16.to_be_bytes());
    table.extend(0i16.to_be_bytes());
    table.extend((advance as i16).to_be_bytes());
    table.extend(1i16.to_be_bytes());
    table.extend(0i16.to_be_bytes());
    table.extend(0i16.to_be_bytes());
    table.extend([0u8; 8]);
    table.extend(0i16.to_be_bytes());
    table.extend(num_glyphs.to_be_bytes());
    table
}

fn hmtx(advance: u16, num_glyphs: u16) -> Vec<u8> {
    (0..num_glyphs)
        .flat_map(|_| {
            let mut metric = advance.to_be_bytes().to_vec();
            metric.extend(0i16.to_be_bytes());
            metric
        })
        .collect()
}

fn maxp(num_glyphs: u16) -> Vec<u8> {
    let mut table = 0x0000_5000u32.to_be_bytes().to_vec();
    table.extend(num_glyphs.to_be_bytes());
    table
}
