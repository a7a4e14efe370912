use image::Rgba;

pub struct Colours {
    pub background: Rgba<u8>,
    pub panel: Rgba<u8>,
    pub header: Rgba<u8>,
    pub text: Rgba<u8>,
    pub label: Rgba<u8>,
    pub ground: Rgba<u8>,
    pub warehouse: Rgba<u8>,
    pub warehouse_hover: Rgba<u8>,
    pub warehouse_selected: Rgba<u8>,
    pub office: Rgba<u8>,
    pub ring: Rgba<u8>,
    pub series: [Rgba<u8>; 4],
}

impl Default for Colours {
    fn default() -> Self {
        Self {
            background: Rgba([13, 17, 23, 255]),          // Near black - scene backdrop
            panel: Rgba([22, 27, 34, 255]),               // Slate - side panel
            header: Rgba([114, 159, 207, 255]),           // Steel blue - for headers
            text: Rgba([230, 237, 243, 255]),             // Off-white - for values
            label: Rgba([139, 148, 158, 255]),            // Grey - for field labels
            ground: Rgba([34, 80, 34, 255]),              // Dark green - ground grid
            warehouse: Rgba([204, 204, 204, 255]),        // Light grey - warehouse walls
            warehouse_hover: Rgba([237, 212, 0, 255]),    // Golden yellow - under the pointer
            warehouse_selected: Rgba([245, 121, 0, 255]), // Burnt orange - selected
            office: Rgba([221, 221, 221, 255]),           // Pale grey - office building
            ring: Rgba([64, 158, 255, 255]),              // Blue - pulse rings
            series: [
                Rgba([204, 0, 0, 255]),    // Crimson - first series
                Rgba([0, 188, 212, 255]),  // Cyan - second series
                Rgba([87, 174, 36, 255]),  // Green
                Rgba([173, 127, 168, 255]), // Lavender
            ],
        }
    }
}

impl Colours {
    pub fn series(&self, index: usize) -> Rgba<u8> {
        self.series[index % self.series.len()]
    }
}
