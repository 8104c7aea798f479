//! Paginated [PDF] document rendering.
//!
//! Only the standard Helvetica fonts are used, so no font files are embedded
//! and the text is limited to the [WinAnsiEncoding] (Latin-1) characters.
//! Images are embedded as [JPEG]s only, passed through untouched.
//!
//! [JPEG]: https://en.wikipedia.org/wiki/JPEG
//! [PDF]: https://opensource.adobe.com/dc-acrobat-sdk-docs/pdfstandards/pdfreference1.4.pdf
//! [WinAnsiEncoding]: https://en.wikipedia.org/wiki/Windows-1252

/// A4 page width in points.
const PAGE_WIDTH: u32 = 595;

/// A4 page height in points.
const PAGE_HEIGHT: u32 = 842;

/// Page margin in points.
const MARGIN: u32 = 50;

/// Line height relative to the font size, in tenths.
const LINE_HEIGHT: u32 = 14;

/// Maximum height of an embedded image in points.
const MAX_IMAGE_HEIGHT: u32 = 300;

/// Number of the first image object, following the catalog, the page tree
/// and the two fonts.
const FIRST_IMAGE_OBJ: usize = 5;

/// Document being composed block by block.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// Blocks of this [`Document`] in order.
    blocks: Vec<Block>,

    /// Images embedded into this [`Document`], referenced by [`Block::Image`]
    /// indices.
    images: Vec<Jpeg>,
}

/// Single block of a [`Document`] taking the full page width.
#[derive(Clone, Debug)]
enum Block {
    /// Line of text.
    Line(Line),

    /// Image by its index along with its size in points.
    Image {
        /// Index of the [`Jpeg`] in the [`Document`].
        index: usize,

        /// Width in points.
        width: u32,

        /// Height in points.
        height: u32,
    },
}

impl Block {
    /// Returns the vertical space this [`Block`] occupies, in points.
    fn height(&self) -> u32 {
        match self {
            Self::Line(line) => line.size * LINE_HEIGHT / 10,
            Self::Image { height, .. } => height + 4,
        }
    }
}

/// Single line of a [`Document`].
#[derive(Clone, Debug)]
struct Line {
    /// Text of this [`Line`], empty for a gap.
    text: String,

    /// Font size in points.
    size: u32,

    /// Indicator whether the bold font is used.
    bold: bool,
}

/// [JPEG] image embeddable into a [`Document`] as is.
///
/// [JPEG]: https://en.wikipedia.org/wiki/JPEG
#[derive(Clone, Debug)]
pub struct Jpeg {
    /// Encoded bytes.
    data: Vec<u8>,

    /// Width in pixels.
    width: u32,

    /// Height in pixels.
    height: u32,

    /// Number of color components.
    components: u8,
}

impl Jpeg {
    /// Reads the frame header of the provided [JPEG] `data`.
    ///
    /// Returns [`None`] if the `data` is not a [JPEG] with 1, 3 or 4 color
    /// components.
    ///
    /// [JPEG]: https://en.wikipedia.org/wiki/JPEG
    #[must_use]
    pub fn parse(data: Vec<u8>) -> Option<Self> {
        let (width, height, components) = frame_header(&data)?;
        (width > 0 && height > 0 && matches!(components, 1 | 3 | 4)).then(
            || Self {
                data,
                width,
                height,
                components,
            },
        )
    }

    /// Returns the [PDF] image XObject dictionary and stream of this
    /// [`Jpeg`].
    ///
    /// [PDF]: https://en.wikipedia.org/wiki/PDF
    fn to_object(&self) -> Vec<u8> {
        let color = match self.components {
            1 => "/DeviceGray",
            // Adobe writes CMYK JPEGs inverted.
            4 => "/DeviceCMYK /Decode [1 0 1 0 1 0 1 0]",
            _ => "/DeviceRGB",
        };
        let mut obj = format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace {color} /BitsPerComponent 8 /Filter /DCTDecode \
             /Length {} >>\nstream\n",
            self.width,
            self.height,
            self.data.len(),
        )
        .into_bytes();
        obj.extend_from_slice(&self.data);
        obj.extend_from_slice(b"\nendstream");
        obj
    }
}

impl Document {
    /// Creates a new empty [`Document`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a heading.
    pub fn heading(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.push(text.as_ref(), 16, true)
    }

    /// Appends a bold label line.
    pub fn label(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.push(text.as_ref(), 9, true)
    }

    /// Appends a paragraph of regular text, wrapping it to the page width.
    pub fn paragraph(&mut self, text: impl AsRef<str>) -> &mut Self {
        for line in text.as_ref().lines() {
            _ = self.push(line, 10, false);
        }
        self
    }

    /// Appends an empty gap.
    pub fn gap(&mut self) -> &mut Self {
        self.blocks.push(Block::Line(Line {
            text: String::new(),
            size: 6,
            bold: false,
        }));
        self
    }

    /// Appends the provided [`Jpeg`] image, scaled down to fit the page.
    pub fn image(&mut self, jpeg: Jpeg) -> &mut Self {
        let max_width = PAGE_WIDTH - 2 * MARGIN;
        let (mut width, mut height) = (jpeg.width, jpeg.height);
        if width > max_width {
            height = (height * max_width / width).max(1);
            width = max_width;
        }
        if height > MAX_IMAGE_HEIGHT {
            width = (width * MAX_IMAGE_HEIGHT / height).max(1);
            height = MAX_IMAGE_HEIGHT;
        }
        self.blocks.push(Block::Image {
            index: self.images.len(),
            width,
            height,
        });
        self.images.push(jpeg);
        self
    }

    /// Returns the number of pages this [`Document`] renders into.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.paginate().len()
    }

    /// Renders this [`Document`] into [PDF] bytes.
    ///
    /// [PDF]: https://en.wikipedia.org/wiki/PDF
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let pages = self.paginate();

        // Objects: 1 catalog, 2 page tree, 3-4 fonts, then the images, then a
        // page and its content stream for every page.
        let first_page = FIRST_IMAGE_OBJ + self.images.len();
        let mut objects =
            Vec::with_capacity(first_page - 1 + 2 * pages.len());
        let kids = (0..pages.len())
            .map(|n| format!("{} 0 R", first_page + 2 * n))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        objects.push(
            format!(
                "<< /Type /Pages /Kids [{kids}] /Count {} >>",
                pages.len(),
            )
            .into_bytes(),
        );
        for font in ["Helvetica", "Helvetica-Bold"] {
            objects.push(
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{font} \
                     /Encoding /WinAnsiEncoding >>",
                )
                .into_bytes(),
            );
        }
        objects.extend(self.images.iter().map(Jpeg::to_object));
        for (n, page) in pages.iter().enumerate() {
            let xobjects = page
                .iter()
                .filter_map(|(block, _)| match block {
                    Block::Image { index, .. } => Some(format!(
                        "/Im{} {} 0 R",
                        index + 1,
                        FIRST_IMAGE_OBJ + index,
                    )),
                    Block::Line(_) => None,
                })
                .collect::<Vec<_>>()
                .join(" ");
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R \
                     /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                     /Contents {} 0 R \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> \
                     /XObject << {xobjects} >> >> >>",
                    first_page + 1 + 2 * n,
                )
                .into_bytes(),
            );
            let stream = content_stream(page);
            let mut obj = format!("<< /Length {} >>\nstream\n", stream.len())
                .into_bytes();
            obj.extend_from_slice(&stream);
            obj.extend_from_slice(b"\nendstream");
            objects.push(obj);
        }

        let mut buf = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (n, obj) in objects.iter().enumerate() {
            offsets.push(buf.len());
            buf.extend_from_slice(format!("{} 0 obj\n", n + 1).as_bytes());
            buf.extend_from_slice(obj);
            buf.extend_from_slice(b"\nendobj\n");
        }

        let xref = buf.len();
        buf.extend_from_slice(
            format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1)
                .as_bytes(),
        );
        for offset in offsets {
            buf.extend_from_slice(
                format!("{offset:010} 00000 n \n").as_bytes(),
            );
        }
        buf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\n\
                 startxref\n{xref}\n%%EOF\n",
                objects.len() + 1,
            )
            .as_bytes(),
        );
        buf
    }

    /// Pushes a single logical line, wrapping it if needed.
    fn push(&mut self, text: &str, size: u32, bold: bool) -> &mut Self {
        for chunk in wrap(text, max_chars(size)) {
            self.blocks.push(Block::Line(Line {
                text: chunk,
                size,
                bold,
            }));
        }
        self
    }

    /// Splits the [`Block`]s of this [`Document`] into pages, each block
    /// paired with its bottom position.
    fn paginate(&self) -> Vec<Vec<(&Block, u32)>> {
        let mut pages = vec![vec![]];
        let mut y = PAGE_HEIGHT - MARGIN;
        for block in &self.blocks {
            let height = block.height();
            if y < MARGIN + height {
                pages.push(vec![]);
                y = PAGE_HEIGHT - MARGIN;
            }
            y -= height;
            if let Some(page) = pages.last_mut() {
                page.push((block, y));
            }
        }
        pages
    }
}

/// Builds the content stream of a single page.
fn content_stream(blocks: &[(&Block, u32)]) -> Vec<u8> {
    let mut stream = vec![];
    for (block, y) in blocks {
        match block {
            Block::Line(line) => {
                if line.text.is_empty() {
                    continue;
                }
                let font = if line.bold { "/F2" } else { "/F1" };
                stream.extend_from_slice(
                    format!(
                        "BT\n{font} {} Tf\n1 0 0 1 {MARGIN} {y} Tm\n(",
                        line.size,
                    )
                    .as_bytes(),
                );
                stream.extend(encode(&line.text));
                stream.extend_from_slice(b") Tj\nET\n");
            }
            Block::Image {
                index,
                width,
                height,
            } => {
                stream.extend_from_slice(
                    format!(
                        "q\n{width} 0 0 {height} {MARGIN} {} cm\n\
                         /Im{} Do\nQ\n",
                        y + 2,
                        index + 1,
                    )
                    .as_bytes(),
                );
            }
        }
    }
    stream
}

/// Reads width, height and the number of color components from the frame
/// header of the provided [JPEG] `data`.
///
/// [JPEG]: https://en.wikipedia.org/wiki/JPEG
fn frame_header(data: &[u8]) -> Option<(u32, u32, u8)> {
    if data.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut i = 2;
    loop {
        if *data.get(i)? != 0xFF {
            return None;
        }
        let marker = *data.get(i + 1)?;
        match marker {
            // Fill byte.
            0xFF => {
                i += 1;
                continue;
            }
            // Standalone markers.
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            // End of image or start of scan before any frame.
            0xD9 | 0xDA => return None,
            _ => {}
        }
        let len = usize::from(u16::from_be_bytes([
            *data.get(i + 2)?,
            *data.get(i + 3)?,
        ]));
        if matches!(
            marker,
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF
        ) {
            let frame = data.get(i + 4..i + 2 + len)?;
            let height = u16::from_be_bytes([*frame.get(1)?, *frame.get(2)?]);
            let width = u16::from_be_bytes([*frame.get(3)?, *frame.get(4)?]);
            return Some((width.into(), height.into(), *frame.get(5)?));
        }
        i += 2 + len;
    }
}

/// Encodes the provided `text` as an escaped [WinAnsiEncoding] PDF string
/// body.
///
/// Characters outside of Latin-1 are replaced with `?`.
///
/// [WinAnsiEncoding]: https://en.wikipedia.org/wiki/Windows-1252
fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => out.extend_from_slice(b"\\("),
            ')' => out.extend_from_slice(b"\\)"),
            '\\' => out.extend_from_slice(b"\\\\"),
            ' '..='~' | '\u{A0}'..='\u{FF}' => {
                out.push(u8::try_from(u32::from(c)).unwrap_or(b'?'));
            }
            '\t' => out.push(b' '),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Returns the approximate number of characters fitting a line of the
/// provided font `size`.
fn max_chars(size: u32) -> usize {
    // Helvetica averages about half of the font size per glyph.
    usize::try_from((PAGE_WIDTH - 2 * MARGIN) * 2 / size).unwrap_or(80)
}

/// Wraps the provided `text` by words into chunks of at most `width`
/// characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut chunks = vec![];
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(width)
                .map_or(word.len(), |(i, _)| i);
            chunks.push(word[..split].to_owned());
            word = &word[split..];
        }
        if !current.is_empty()
            && current.chars().count() + 1 + word.chars().count() > width
        {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
